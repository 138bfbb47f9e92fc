use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::tags::repo_types::Tag;

/// Title given to events created without one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Row of the `events` table as read by sqlx.
#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub images: Option<Json<Vec<String>>>,
    pub event_date: Date,
    pub is_public: bool,
    pub is_featured: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// An active event; soft-deleted rows never leave the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub event_date: Date,
    pub is_public: bool,
    pub is_featured: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Loaded on demand; `None` means "not fetched", not "no tags".
    pub tags: Option<Vec<Tag>>,
}

impl From<EventRow> for Event {
    fn from(r: EventRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            title: r
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: r.content,
            images: r.images.map(|Json(v)| v).unwrap_or_default(),
            event_date: r.event_date,
            is_public: r.is_public,
            is_featured: r.is_featured,
            created_at: r.created_at,
            updated_at: r.updated_at,
            tags: None,
        }
    }
}

/// Fields supplied when inserting an event; the store assigns id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub event_date: Date,
    pub is_public: bool,
}
