// src/lib.rs
// Public library surface shared by both binaries and the integration tests.

pub mod aggregate;
pub mod analysis;
pub mod api;
pub mod backfill;
pub mod config;
pub mod crawl;
pub mod logging;
pub mod metrics;
pub mod predict;
pub mod scheduler;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{get_daily_sentiment, DailySummary, SourceClass};
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::predict::{predict_trend, Direction, Prediction};

use std::sync::Arc;

use crate::sentiment::LexiconScorer;
use crate::store::SqlitePostStore;

/// Open the configured SQLite store and build the API state around it.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let db = cfg.db_path.to_string_lossy();
    let store = SqlitePostStore::open(&db).await?;
    Ok(AppState {
        store: Arc::new(store),
        scorer: Arc::new(LexiconScorer::new()),
        window_days: cfg.window_days,
    })
}
