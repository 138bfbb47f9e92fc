use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{on_insert, StoreResult};
use crate::tags::repo_types::Tag;

#[async_trait]
pub trait TagRepo: Send + Sync {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>>;
    /// Fails with [`crate::db::StoreError::Duplicate`] when the name is taken.
    async fn insert(&self, name: &str) -> StoreResult<Tag>;
}

#[derive(Clone)]
pub struct PgTagRepo {
    db: PgPool,
}

impl PgTagRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TagRepo for PgTagRepo {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(r#"SELECT id, name FROM tags WHERE name = $1"#)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        Ok(tag)
    }

    async fn insert(&self, name: &str) -> StoreResult<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(on_insert)?;
        Ok(tag)
    }
}
