use anyhow::Context;
use serde::Deserialize;

/// Where uploaded event images end up.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    /// Files written under `upload_dir`, served by the app at `/static/uploads`.
    Local { upload_dir: String },
    /// S3 / MinIO bucket.
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
        public_url: String,
    },
}

/// Argon2id cost parameters for new password hashes. Existing hashes keep
/// the costs recorded in their PHC string.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub body_limit_mb: usize,
    pub password: PasswordConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_or("APP_PORT", 8080);
        let body_limit_mb = parse_or("BODY_LIMIT_MB", 20);
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: parse_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: parse_or("ARGON2_PARALLELISM", defaults.parallelism),
        };

        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .as_str()
        {
            "local" => StorageConfig::Local {
                upload_dir: std::env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "static/uploads".into()),
            },
            "s3" => {
                let endpoint = std::env::var("S3_ENDPOINT").context("S3_ENDPOINT is not set")?;
                let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET is not set")?;
                let public_url = std::env::var("S3_PUBLIC_URL")
                    .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
                StorageConfig::S3 {
                    access_key: std::env::var("S3_ACCESS_KEY")
                        .context("S3_ACCESS_KEY is not set")?,
                    secret_key: std::env::var("S3_SECRET_KEY")
                        .context("S3_SECRET_KEY is not set")?,
                    region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
                    endpoint,
                    bucket,
                    public_url,
                }
            }
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected local or s3"),
        };

        Ok(Self {
            database_url,
            db_max_connections,
            host,
            port,
            body_limit_mb,
            password,
            storage,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
