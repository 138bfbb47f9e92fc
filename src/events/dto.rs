use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    events::{repo_types::Event, services::EventUpdate},
    patch::Patch,
};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_event_date(raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid(format!("invalid event_date {raw:?}, expected YYYY-MM-DD")))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub images: Patch<Vec<String>>,
    #[serde(default)]
    pub is_public: Patch<bool>,
    #[serde(default)]
    pub event_date: Patch<String>,
}

impl UpdateEventRequest {
    pub fn into_update(self) -> AppResult<EventUpdate> {
        let event_date = match self.event_date {
            Patch::Set(raw) => Patch::Set(parse_event_date(&raw)?),
            Patch::Unset => Patch::Unset,
        };
        Ok(EventUpdate {
            title: self.title,
            content: self.content,
            images: self.images,
            is_public: self.is_public,
            event_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TagNamesRequest {
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Serialize)]
pub struct EventView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub is_public: bool,
    pub event_date: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl From<Event> for EventView {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            title: e.title,
            content: e.content,
            images: e.images,
            is_public: e.is_public,
            // the format only has numeric components, it cannot fail for a valid Date
            event_date: e.event_date.format(DATE_FORMAT).unwrap_or_default(),
            created_at: e.created_at,
            updated_at: e.updated_at,
            tags: e
                .tags
                .map(|tags| tags.into_iter().map(|t| t.name).collect()),
        }
    }
}
