use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

/// Errors surfaced by the store layer.
///
/// Lookups report a missing row as `Ok(None)`; only a unique-constraint hit is
/// singled out so callers can treat it as "already exists".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row already exists")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Longest value the `VARCHAR(255)` columns (account, nickname, title) accept.
pub const MAX_TEXT_LEN: usize = 255;

/// Converts a unique-constraint violation into [`StoreError::Duplicate`].
pub fn on_insert(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(e)
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Ids are opaque strings at the boundary; anything that is not a UUID can
/// never match a row.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
