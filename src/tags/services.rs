use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    db::StoreError,
    error::{AppError, AppResult},
    tags::{
        repo::TagRepo,
        repo_types::{Tag, MAX_TAG_NAME_LEN},
    },
};

/// Resolves tag names to tag rows, creating missing ones.
#[derive(Clone)]
pub struct TagService {
    repo: Arc<dyn TagRepo>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepo>) -> Self {
        Self { repo }
    }

    /// Returns one tag per non-empty (trimmed) input name, creating those that
    /// do not exist yet. Repeated names resolve to the same tag.
    #[instrument(skip(self))]
    pub async fn ensure_tags_by_name(&self, names: &[String]) -> AppResult<Vec<Tag>> {
        let mut resolved: HashMap<&str, Tag> = HashMap::new();
        let mut out = Vec::with_capacity(names.len());

        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if name.chars().count() > MAX_TAG_NAME_LEN {
                return Err(AppError::invalid(format!(
                    "tag name longer than {MAX_TAG_NAME_LEN} characters"
                )));
            }
            if let Some(tag) = resolved.get(name) {
                out.push(tag.clone());
                continue;
            }
            let tag = self.ensure_one(name).await?;
            resolved.insert(name, tag.clone());
            out.push(tag);
        }
        Ok(out)
    }

    async fn ensure_one(&self, name: &str) -> AppResult<Tag> {
        if let Some(tag) = self.repo.find_by_name(name).await? {
            return Ok(tag);
        }
        match self.repo.insert(name).await {
            Ok(tag) => {
                debug!(tag_id = %tag.id, %name, "tag created");
                Ok(tag)
            }
            // someone else created it between our lookup and insert
            Err(StoreError::Duplicate) => self
                .repo
                .find_by_name(name)
                .await?
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("tag {name:?} vanished"))),
            Err(e) => Err(e.into()),
        }
    }
}
