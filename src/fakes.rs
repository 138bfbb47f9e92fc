//! In-memory stores for tests.
//!
//! One `MemoryStore` implements every store trait so services that share a
//! database in production share state here too. Uniqueness and soft-delete
//! filtering mirror the constraints in `migrations/`.

use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    db::{StoreError, StoreResult},
    events::{
        repo::EventRepo,
        repo_types::{Event, NewEvent},
    },
    storage::StorageClient,
    tags::{repo::TagRepo, repo_types::Tag},
    users::{repo::UserRepo, repo_types::User},
};

/// A stored value plus its soft-delete mark.
struct Row<T> {
    value: T,
    deleted_at: Option<OffsetDateTime>,
}

impl<T> Row<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            deleted_at: None,
        }
    }

    fn active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

struct Link {
    event_id: Uuid,
    tag_id: Uuid,
    deleted: bool,
}

#[derive(Default)]
struct Inner {
    users: Vec<Row<User>>,
    events: Vec<Row<Event>>,
    tags: Vec<Tag>,
    links: Vec<Link>,
    last_ts: Option<OffsetDateTime>,
    hide_accounts: bool,
    hidden_tag_lookups: usize,
}

impl Inner {
    /// Strictly increasing timestamps so creation order is observable.
    fn now(&mut self) -> OffsetDateTime {
        let mut now = OffsetDateTime::now_utc();
        if let Some(last) = self.last_ts {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_ts = Some(now);
        now
    }

    fn active_event(&self, id: Uuid) -> Option<&Event> {
        self.events
            .iter()
            .find(|r| r.value.id == id && r.active())
            .map(|r| &r.value)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Rows in `users`, soft-deleted ones included.
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    pub fn tag_count(&self) -> usize {
        self.lock().tags.len()
    }

    pub fn make_admin(&self, id: Uuid) {
        let mut inner = self.lock();
        if let Some(r) = inner.users.iter_mut().find(|r| r.value.id == id) {
            r.value.is_admin = true;
        }
    }

    /// Makes account lookups miss, as if a concurrent signup had not
    /// committed yet.
    pub fn hide_accounts_from_lookup(&self, hide: bool) {
        self.lock().hide_accounts = hide;
    }

    /// The next `n` tag-name lookups miss.
    pub fn hide_tags_from_lookup(&self, n: usize) {
        self.lock().hidden_tag_lookups = n;
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, account: &str, password_hash: &str) -> StoreResult<User> {
        let mut inner = self.lock();
        if inner
            .users
            .iter()
            .any(|r| r.value.account == account && r.active())
        {
            return Err(StoreError::Duplicate);
        }
        let now = inner.now();
        let user = User {
            id: Uuid::new_v4(),
            account: account.to_string(),
            password_hash: password_hash.to_string(),
            nickname: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(Row::new(user.clone()));
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|r| r.value.id == id && r.active())
            .map(|r| r.value.clone()))
    }

    async fn find_by_account(&self, account: &str) -> StoreResult<Option<User>> {
        let inner = self.lock();
        if inner.hide_accounts {
            return Ok(None);
        }
        Ok(inner
            .users
            .iter()
            .find(|r| r.value.account == account && r.active())
            .map(|r| r.value.clone()))
    }

    async fn list_active(&self) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|r| r.active())
            .map(|r| r.value.clone())
            .collect())
    }

    async fn save(&self, user: &User) -> StoreResult<Option<User>> {
        let mut inner = self.lock();
        let now = inner.now();
        let Some(stored) = inner
            .users
            .iter_mut()
            .find(|r| r.value.id == user.id && r.active())
            .map(|r| &mut r.value)
        else {
            return Ok(None);
        };
        stored.nickname = user.nickname.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = now;
        Ok(Some(stored.clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock();
        let now = inner.now();
        if let Some(r) = inner
            .users
            .iter_mut()
            .find(|r| r.value.id == id && r.active())
        {
            r.deleted_at = Some(now);
        }
        Ok(())
    }
}

#[async_trait]
impl TagRepo for MemoryStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let mut inner = self.lock();
        if inner.hidden_tag_lookups > 0 {
            inner.hidden_tag_lookups -= 1;
            return Ok(None);
        }
        Ok(inner.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn insert(&self, name: &str) -> StoreResult<Tag> {
        let mut inner = self.lock();
        if inner.tags.iter().any(|t| t.name == name) {
            return Err(StoreError::Duplicate);
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        inner.tags.push(tag.clone());
        Ok(tag)
    }
}

fn newest_first(events: &mut [Event]) {
    events.sort_by_key(|e| Reverse((e.event_date, e.created_at)));
}

#[async_trait]
impl EventRepo for MemoryStore {
    async fn create(&self, event: &NewEvent) -> StoreResult<Event> {
        let mut inner = self.lock();
        let now = inner.now();
        let e = Event {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            title: event.title.clone(),
            content: event.content.clone(),
            images: event.images.clone(),
            event_date: event.event_date,
            is_public: event.is_public,
            is_featured: false,
            created_at: now,
            updated_at: now,
            tags: None,
        };
        inner.events.push(Row::new(e.clone()));
        Ok(e)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.lock().active_event(id).cloned())
    }

    async fn save(&self, event: &Event) -> StoreResult<Option<Event>> {
        let mut inner = self.lock();
        let now = inner.now();
        let Some(stored) = inner
            .events
            .iter_mut()
            .find(|r| r.value.id == event.id && r.active())
            .map(|r| &mut r.value)
        else {
            return Ok(None);
        };
        stored.title = event.title.clone();
        stored.content = event.content.clone();
        stored.images = event.images.clone();
        stored.event_date = event.event_date;
        stored.is_public = event.is_public;
        stored.is_featured = event.is_featured;
        stored.updated_at = now;
        Ok(Some(stored.clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let mut out: Vec<Event> = self
            .lock()
            .events
            .iter()
            .filter(|r| r.value.user_id == user_id && r.active())
            .map(|r| r.value.clone())
            .collect();
        newest_first(&mut out);
        Ok(out)
    }

    async fn list_by_tag(&self, tag_name: &str) -> StoreResult<Vec<Event>> {
        let inner = self.lock();
        let Some(tag) = inner.tags.iter().find(|t| t.name == tag_name) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Event> = inner
            .links
            .iter()
            .filter(|l| l.tag_id == tag.id && !l.deleted)
            .filter_map(|l| inner.active_event(l.event_id).cloned())
            .collect();
        newest_first(&mut out);
        Ok(out)
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock();
        let now = inner.now();
        if let Some(r) = inner
            .events
            .iter_mut()
            .find(|r| r.value.id == id && r.active())
        {
            r.deleted_at = Some(now);
        }
        Ok(())
    }

    async fn add_tags(&self, event_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut inner = self.lock();
        for tag_id in tag_ids {
            match inner
                .links
                .iter()
                .position(|l| l.event_id == event_id && l.tag_id == *tag_id)
            {
                Some(i) => inner.links[i].deleted = false,
                None => inner.links.push(Link {
                    event_id,
                    tag_id: *tag_id,
                    deleted: false,
                }),
            }
        }
        Ok(())
    }

    async fn remove_tags(&self, event_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut inner = self.lock();
        for link in inner
            .links
            .iter_mut()
            .filter(|l| l.event_id == event_id && tag_ids.contains(&l.tag_id))
        {
            link.deleted = true;
        }
        Ok(())
    }

    async fn tags_for_events(&self, event_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
        let inner = self.lock();
        let mut out: Vec<(Uuid, Tag)> = inner
            .links
            .iter()
            .filter(|l| !l.deleted && event_ids.contains(&l.event_id))
            .filter_map(|l| {
                inner
                    .tags
                    .iter()
                    .find(|t| t.id == l.tag_id)
                    .map(|t| (l.event_id, t.clone()))
            })
            .collect();
        out.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        Ok(out)
    }
}

/// Object store that remembers keys instead of writing anywhere.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<Vec<String>>,
    unavailable: AtomicBool,
}

impl FakeStorage {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// While set, every write fails like an unreachable bucket.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.unavailable.load(Ordering::SeqCst), "storage unavailable");
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(key.to_string());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|k| k != key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://fake.local/{}", key)
    }
}
