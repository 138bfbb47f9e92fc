use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// Public URL prefix under which the local backend's files are served.
pub const LOCAL_PUBLIC_PREFIX: &str = "/static/uploads";

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// Path or URL a client uses to fetch `key`.
    fn public_url(&self, key: &str) -> String;
}

pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageClient>> {
    let storage: Arc<dyn StorageClient> = match config {
        StorageConfig::Local { upload_dir } => Arc::new(LocalStorage::new(upload_dir)),
        StorageConfig::S3 {
            endpoint,
            bucket,
            access_key,
            secret_key,
            region,
            public_url,
        } => Arc::new(
            S3Storage::new(endpoint, bucket, access_key, secret_key, region, public_url).await?,
        ),
    };
    Ok(storage)
}

/// Files on local disk, laid out by key under `root`.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        anyhow::ensure!(
            rel.components().all(|c| matches!(c, Component::Normal(_))),
            "invalid object key {key:?}"
        );
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create dir {}", dir.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", LOCAL_PUBLIC_PREFIX, key)
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3Storage {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
        public_url: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("dailyspark-storage-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn local_put_and_delete() {
        let storage = LocalStorage::new(temp_root());
        storage
            .put_object("events/u1/a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let on_disk = storage.root().join("events/u1/a.png");
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"png");

        storage.delete_object("events/u1/a.png").await.unwrap();
        assert!(!on_disk.exists());
        let _ = tokio::fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn local_rejects_escaping_keys() {
        let storage = LocalStorage::new(temp_root());
        let err = storage
            .put_object("../outside.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid object key"));
    }

    #[test]
    fn local_public_url_is_under_static_prefix() {
        let storage = LocalStorage::new("static/uploads");
        assert_eq!(
            storage.public_url("events/u1/a.png"),
            "/static/uploads/events/u1/a.png"
        );
    }
}
