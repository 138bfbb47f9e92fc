use anyhow::Context;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

/// A single uploaded file as received from the multipart form.
pub struct UploadItem {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

/// Where an uploaded image ended up.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub key: String,
    pub public_url: String,
}

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_-]+").unwrap();
}

fn sanitize(part: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(part.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.chars().take(64).collect()
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// `events/<user>/<uuid>_<stem>.<ext>`; the uuid keeps keys unique even for
/// identical file names.
pub fn event_image_key(user_id: &str, file_name: Option<&str>, content_type: &str) -> String {
    let (stem, ext) = match file_name.and_then(|n| n.rsplit_once('.')) {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext.to_ascii_lowercase())),
        _ => (file_name.unwrap_or(""), None),
    };
    let ext = ext
        .map(|e| sanitize(&e))
        .or_else(|| ext_from_mime(content_type).map(str::to_string))
        .unwrap_or_else(|| "bin".to_string());
    format!(
        "events/{}/{}_{}.{}",
        sanitize(user_id),
        Uuid::new_v4(),
        sanitize(stem),
        ext
    )
}

pub async fn store_event_image(
    storage: &dyn StorageClient,
    user_id: &str,
    image: UploadItem,
) -> anyhow::Result<StoredImage> {
    anyhow::ensure!(!image.body.is_empty(), "empty image upload");
    let key = event_image_key(user_id, image.file_name.as_deref(), &image.content_type);
    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    info!(%key, "event image stored");
    Ok(StoredImage {
        public_url: storage.public_url(&key),
        key,
    })
}

/// Best effort; a failure only leaves an orphaned object behind.
pub async fn discard_image(storage: &dyn StorageClient, image: &StoredImage) {
    if let Err(e) = storage.delete_object(&image.key).await {
        warn!(error = %e, key = %image.key, "failed to delete orphaned image");
    }
}
