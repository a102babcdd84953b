//! Chatter Sentiment — server entrypoint.
//! Boots the Axum HTTP API, the Prometheus exporter, and the background crawl scheduler.

use anyhow::Context;
use chatter_sentiment::{
    build_state, crawl::default_crawlers, create_router, logging, metrics::Metrics,
    scheduler::spawn_scheduler, AppConfig,
};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = AppConfig::load_default().context("loading chatter config")?;
    tracing::info!(ticker = %cfg.ticker, db = %cfg.db_path.display(), "starting chatter-sentiment");

    let state = build_state(&cfg).await?;

    let crawlers = default_crawlers(&cfg)?;
    spawn_scheduler(
        crawlers,
        state.store.clone(),
        state.scorer.clone(),
        cfg.crawl_interval_minutes,
    );

    let mut router = create_router(state);
    match Metrics::init(cfg.crawl_interval_minutes) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics exporter disabled"),
    }

    Ok(router.into())
}
