use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::StoreResult;
use crate::events::repo_types::{Event, EventRow, NewEvent};
use crate::tags::repo_types::Tag;

const EVENT_COLUMNS: &str = "e.id, e.user_id, e.title, e.content, e.images, e.event_date, \
     e.is_public, e.is_featured, e.created_at, e.updated_at";

/// Persistence for events and their tag associations. Reads only return
/// active events and active associations.
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn create(&self, event: &NewEvent) -> StoreResult<Event>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>>;
    /// Writes back the mutable fields.
    async fn save(&self, event: &Event) -> StoreResult<Option<Event>>;
    /// Ordered by event date, then creation time, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Event>>;
    /// Same ordering as [`EventRepo::list_by_user`].
    async fn list_by_tag(&self, tag_name: &str) -> StoreResult<Vec<Event>>;
    async fn soft_delete(&self, id: Uuid) -> StoreResult<()>;
    /// Links the tags; links that already exist (or were removed) end up active.
    async fn add_tags(&self, event_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()>;
    async fn remove_tags(&self, event_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()>;
    /// Active `(event_id, tag)` pairs for the given events, ordered by tag name.
    async fn tags_for_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>>;
}

#[derive(Clone)]
pub struct PgEventRepo {
    db: PgPool,
}

impl PgEventRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct EventTagRow {
    event_id: Uuid,
    id: Uuid,
    name: String,
}

/// Insert a tag link within a transaction, reviving a soft-removed one.
async fn link_tag_tx(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    tag_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO event_tags (event_id, tag_id)
        VALUES ($1, $2)
        ON CONFLICT (event_id, tag_id) DO UPDATE SET deleted_at = NULL
        "#,
    )
    .bind(event_id)
    .bind(tag_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl EventRepo for PgEventRepo {
    async fn create(&self, event: &NewEvent) -> StoreResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events AS e (user_id, title, content, images, event_date, is_public)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.user_id)
        .bind(&event.title)
        .bind(&event.content)
        .bind(Json(&event.images))
        .bind(event.event_date)
        .bind(event.is_public)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events e
            WHERE e.id = $1 AND e.deleted_at IS NULL
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Event::from))
    }

    async fn save(&self, event: &Event) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events AS e
            SET title = $2, content = $3, images = $4, event_date = $5,
                is_public = $6, is_featured = $7, updated_at = now()
            WHERE e.id = $1 AND e.deleted_at IS NULL
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.content)
        .bind(Json(&event.images))
        .bind(event.event_date)
        .bind(event.is_public)
        .bind(event.is_featured)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Event::from))
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events e
            WHERE e.user_id = $1 AND e.deleted_at IS NULL
            ORDER BY e.event_date DESC, e.created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_by_tag(&self, tag_name: &str) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events e
            JOIN event_tags et ON et.event_id = e.id AND et.deleted_at IS NULL
            JOIN tags t ON t.id = et.tag_id
            WHERE t.name = $1 AND e.deleted_at IS NULL
            ORDER BY e.event_date DESC, e.created_at DESC
            "#
        ))
        .bind(tag_name)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE events
            SET deleted_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn add_tags(&self, event_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        for tag_id in tag_ids {
            link_tag_tx(&mut tx, event_id, *tag_id).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_tags(&self, event_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE event_tags
            SET deleted_at = now()
            WHERE event_id = $1 AND tag_id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(event_id)
        .bind(tag_ids)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn tags_for_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
        let rows = sqlx::query_as::<_, EventTagRow>(
            r#"
            SELECT et.event_id, t.id, t.name
            FROM event_tags et
            JOIN tags t ON t.id = et.tag_id
            WHERE et.event_id = ANY($1) AND et.deleted_at IS NULL
            ORDER BY t.name ASC
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.event_id, Tag { id: r.id, name: r.name }))
            .collect())
    }
}
