// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::backfill::backfill_sentiment;
use crate::config::MAX_CRAWL_INTERVAL_MINUTES;
use crate::crawl::{run_crawlers, types::CrawlReport, types::Crawler};
use crate::sentiment::SentimentScorer;
use crate::store::PostStore;

/// Outcome of one crawl + auto-score cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CycleReport {
    pub crawl: CrawlReport,
    pub scored: usize,
}

/// Crawl everything once, then score new posts if anything was inserted.
///
/// Never fails: crawler and backfill errors are logged and the cycle ends.
pub async fn run_cycle(
    crawlers: &[Box<dyn Crawler>],
    store: &dyn PostStore,
    scorer: &dyn SentimentScorer,
) -> CycleReport {
    let crawl = run_crawlers(crawlers, store).await;
    counter!("crawl_cycles_total").increment(1);

    let mut scored = 0;
    if crawl.inserted > 0 {
        match backfill_sentiment(store, scorer).await {
            Ok(n) => scored = n,
            Err(e) => tracing::warn!(error = ?e, "auto-score after crawl failed"),
        }
    }

    tracing::info!(
        target: "scheduler",
        fetched = crawl.fetched,
        inserted = crawl.inserted,
        scored,
        "crawl cycle done"
    );
    CycleReport { crawl, scored }
}

/// Tick period for an interval in minutes, clamped to `1..=MAX_CRAWL_INTERVAL_MINUTES`.
pub fn crawl_period(interval_minutes: u64) -> Duration {
    let minutes = interval_minutes.clamp(1, MAX_CRAWL_INTERVAL_MINUTES);
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Spawn the periodic crawl loop. The first cycle runs immediately.
pub fn spawn_scheduler(
    crawlers: Vec<Box<dyn Crawler>>,
    store: Arc<dyn PostStore>,
    scorer: Arc<dyn SentimentScorer>,
    interval_minutes: u64,
) -> JoinHandle<()> {
    let period = crawl_period(interval_minutes);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // a slow cycle should not trigger a burst of catch-up crawls
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(target: "scheduler", every_min = interval_minutes, "scheduler started");
        loop {
            ticker.tick().await;
            run_cycle(&crawlers, store.as_ref(), scorer.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::LexiconScorer;
    use crate::store::{InMemoryPostStore, NewPost};
    use anyhow::Result;

    struct Fixed(Vec<NewPost>);

    #[async_trait::async_trait]
    impl Crawler for Fixed {
        async fn crawl(&self) -> Result<Vec<NewPost>> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn crawl_period_is_bounded() {
        assert_eq!(crawl_period(0), Duration::from_secs(60));
        assert_eq!(crawl_period(720), Duration::from_secs(720 * 60));
        assert_eq!(
            crawl_period(u64::MAX),
            Duration::from_secs(MAX_CRAWL_INTERVAL_MINUTES * 60)
        );
    }

    #[tokio::test]
    async fn scores_only_when_something_new_arrived() {
        let store = InMemoryPostStore::new();
        let scorer = LexiconScorer::new();
        let crawlers: Vec<Box<dyn Crawler>> = vec![Box::new(Fixed(vec![NewPost::new(
            "reddit",
            "a1",
            "NVDA looks strong",
            "",
        )]))];

        let first = run_cycle(&crawlers, &store, &scorer).await;
        assert_eq!(first.crawl.inserted, 1);
        assert_eq!(first.scored, 1);

        let second = run_cycle(&crawlers, &store, &scorer).await;
        assert_eq!(second.crawl.inserted, 0);
        assert_eq!(second.scored, 0);
    }
}
