use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub account: String,       // unique among active users, never updated
    pub password_hash: String, // Argon2 PHC string, never leaves the service layer
    pub nickname: Option<String>,
    pub is_admin: bool, // set at creation only
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
