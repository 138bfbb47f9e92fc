use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{on_insert, StoreResult};
use crate::users::repo_types::User;

const USER_COLUMNS: &str =
    "id, account, password_hash, nickname, is_admin, created_at, updated_at";

/// Persistence for user accounts. Every read only sees active (not
/// soft-deleted) users.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts a non-admin user. A clash on the account handle yields
    /// [`crate::db::StoreError::Duplicate`].
    async fn create(&self, account: &str, password_hash: &str) -> StoreResult<User>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_account(&self, account: &str) -> StoreResult<Option<User>>;
    async fn list_active(&self) -> StoreResult<Vec<User>>;
    /// Writes back the mutable fields (nickname, password hash).
    async fn save(&self, user: &User) -> StoreResult<Option<User>>;
    async fn soft_delete(&self, id: Uuid) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, account: &str, password_hash: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (account, password_hash, is_admin)
            VALUES ($1, $2, FALSE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(account)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(on_insert)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_account(&self, account: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE account = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(account)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list_active(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn save(&self, user: &User) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET nickname = $2, password_hash = $3, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.nickname)
        .bind(&user.password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
