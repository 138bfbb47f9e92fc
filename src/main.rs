use std::sync::Arc;

use time::UtcOffset;

mod app;
mod config;
mod db;
mod error;
mod events;
#[cfg(test)]
mod fakes;
mod images;
mod patch;
mod state;
mod storage;
mod tags;
mod users;

use crate::{config::AppConfig, state::AppState};

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "dailyspark=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

// The local offset can only be read while the process is single threaded,
// so it is captured before the runtime starts.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let local_offset = UtcOffset::current_local_offset();
    init_tracing();

    let local_offset = local_offset.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "local UTC offset unavailable; using UTC for event dates");
        UtcOffset::UTC
    });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(local_offset))
}

async fn run(local_offset: UtcOffset) -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env()?);
    let db = db::connect(&config).await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    let storage = storage::from_config(&config.storage).await?;
    let state = AppState::from_parts(config.clone(), db, storage, local_offset)?;

    let app = app::build_app(state);
    app::serve(app, &config).await
}
