use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::{parse_id, MAX_TEXT_LEN},
    error::{AppError, AppResult},
    events::{
        repo::EventRepo,
        repo_types::{Event, NewEvent, DEFAULT_TITLE},
    },
    patch::Patch,
    tags::services::TagService,
    users::repo::UserRepo,
};

/// Fields of a partial event update; `Unset` fields keep their stored value.
#[derive(Debug, Default)]
pub struct EventUpdate {
    pub title: Patch<String>,
    pub content: Patch<String>,
    /// Replaces the whole list when set, an empty list included.
    pub images: Patch<Vec<String>>,
    pub is_public: Patch<bool>,
    pub event_date: Patch<Date>,
}

/// Event lifecycle and tagging rules.
#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventRepo>,
    users: Arc<dyn UserRepo>,
    tags: TagService,
    local_offset: UtcOffset,
}

impl EventService {
    /// `local_offset` decides which calendar day "today" is.
    pub fn new(
        events: Arc<dyn EventRepo>,
        users: Arc<dyn UserRepo>,
        tags: TagService,
        local_offset: UtcOffset,
    ) -> Self {
        Self {
            events,
            users,
            tags,
            local_offset,
        }
    }

    // The offset is fixed at startup, so after a DST switch "today" can be
    // off by the shift around midnight until the process restarts.
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.local_offset).date()
    }

    async fn require_user(&self, user_id: &str) -> AppResult<Uuid> {
        let user = match parse_id(user_id) {
            Some(id) => self.users.find_by_id(id).await?,
            None => None,
        };
        user.map(|u| u.id).ok_or_else(|| {
            warn!(%user_id, "user not found");
            AppError::UserNotFound
        })
    }

    async fn require_event(&self, event_id: &str) -> AppResult<Event> {
        let event = match parse_id(event_id) {
            Some(id) => self.events.find_by_id(id).await?,
            None => None,
        };
        event.ok_or_else(|| {
            warn!(%event_id, "event not found");
            AppError::EventNotFound
        })
    }

    async fn attach_tags(&self, events: &mut [Event]) -> AppResult<()> {
        let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let mut by_event: HashMap<Uuid, Vec<_>> = HashMap::new();
        for (event_id, tag) in self.events.tags_for_events(&ids).await? {
            by_event.entry(event_id).or_default().push(tag);
        }
        for e in events.iter_mut() {
            e.tags = Some(by_event.remove(&e.id).unwrap_or_default());
        }
        Ok(())
    }

    async fn reload_with_tags(&self, id: Uuid) -> AppResult<Event> {
        let event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or(AppError::EventNotFound)?;
        let mut events = [event];
        self.attach_tags(&mut events).await?;
        let [event] = events;
        Ok(event)
    }

    /// Creates an event dated `event_date`, or today when absent.
    #[instrument(skip(self, content, images))]
    pub async fn create_event(
        &self,
        user_id: &str,
        content: &str,
        images: Vec<String>,
        is_public: bool,
        event_date: Option<Date>,
    ) -> AppResult<Event> {
        let user_id = user_id.trim();
        let content = content.trim();
        if user_id.is_empty() {
            return Err(AppError::invalid("user_id empty"));
        }
        if content.is_empty() {
            return Err(AppError::invalid("content empty"));
        }

        let owner = self.require_user(user_id).await?;
        let event = self
            .events
            .create(&NewEvent {
                user_id: owner,
                title: DEFAULT_TITLE.to_string(),
                content: content.to_string(),
                images,
                event_date: event_date.unwrap_or_else(|| self.today()),
                is_public,
            })
            .await?;

        info!(event_id = %event.id, user_id = %owner, images = event.images.len(), "event created");
        Ok(event)
    }

    #[instrument(skip(self, update))]
    pub async fn update_event(&self, id: &str, update: EventUpdate) -> AppResult<Event> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::invalid("id empty"));
        }

        let title = update.title.map(|t| t.trim().to_string());
        let content = update.content.map(|c| c.trim().to_string());
        if matches!(&title, Patch::Set(t) if t.is_empty()) {
            return Err(AppError::invalid("title empty"));
        }
        if matches!(&title, Patch::Set(t) if t.chars().count() > MAX_TEXT_LEN) {
            return Err(AppError::invalid(format!(
                "title longer than {MAX_TEXT_LEN} characters"
            )));
        }
        if matches!(&content, Patch::Set(c) if c.is_empty()) {
            return Err(AppError::invalid("content empty"));
        }

        let mut event = self.require_event(id).await?;
        title.apply_to(&mut event.title);
        content.apply_to(&mut event.content);
        update.images.apply_to(&mut event.images);
        update.is_public.apply_to(&mut event.is_public);
        update.event_date.apply_to(&mut event.event_date);

        let updated = self
            .events
            .save(&event)
            .await?
            .ok_or(AppError::EventNotFound)?;
        info!(event_id = %updated.id, "event updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_events_by_user(&self, user_id: &str) -> AppResult<Vec<Event>> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::invalid("user_id empty"));
        }
        let owner = self.require_user(user_id).await?;

        let mut events = self.events.list_by_user(owner).await?;
        self.attach_tags(&mut events).await?;
        info!(user_id = %owner, count = events.len(), "events queried");
        Ok(events)
    }

    /// Soft-deletes the event; unknown or already deleted ids are not an error.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, id: &str) -> AppResult<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::invalid("id empty"));
        }
        if let Some(id) = parse_id(id) {
            self.events.soft_delete(id).await?;
            info!(event_id = %id, "event deleted");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_event_tags(&self, event_id: &str, names: &[String]) -> AppResult<Event> {
        let event = self.tag_target(event_id).await?;
        let ids = self.resolve_tag_ids(names).await?;
        if !ids.is_empty() {
            self.events.add_tags(event.id, &ids).await?;
        }
        info!(event_id = %event.id, tags = ids.len(), "event tags added");
        self.reload_with_tags(event.id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_event_tags(&self, event_id: &str, names: &[String]) -> AppResult<Event> {
        let event = self.tag_target(event_id).await?;
        let ids = self.resolve_tag_ids(names).await?;
        if !ids.is_empty() {
            self.events.remove_tags(event.id, &ids).await?;
        }
        info!(event_id = %event.id, tags = ids.len(), "event tags removed");
        self.reload_with_tags(event.id).await
    }

    async fn resolve_tag_ids(&self, names: &[String]) -> AppResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .tags
            .ensure_tags_by_name(names)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn tag_target(&self, event_id: &str) -> AppResult<Event> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Err(AppError::invalid("event_id empty"));
        }
        self.require_event(event_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_events_by_tag(&self, tag_name: &str) -> AppResult<Vec<Event>> {
        let tag_name = tag_name.trim();
        if tag_name.is_empty() {
            return Err(AppError::invalid("tag empty"));
        }
        let mut events = self.events.list_by_tag(tag_name).await?;
        self.attach_tags(&mut events).await?;
        info!(tag = %tag_name, count = events.len(), "events queried by tag");
        Ok(events)
    }
}
