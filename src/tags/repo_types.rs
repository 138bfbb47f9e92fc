use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Longest tag name the `tags.name` column accepts.
pub const MAX_TAG_NAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}
