//! # Daily Aggregator
//! Groups scored posts of a trailing window into per-day, per-source
//! weighted averages.
//!
//! Policy:
//! - reddit posts weigh `max(upvotes, 1)` (missing upvotes count as 1),
//! - news posts always weigh 1,
//! - `combined_avg` is weighted over the union of both classes, not the mean
//!   of the two class averages,
//! - an empty (or zero-weight) average is `0.0`; use the `*_count` fields to
//!   tell "no posts" from "neutral posts".

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{PostStore, ScoredObservation};

/// Default trailing window in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 14;
/// Upper bound accepted for a window, from config or the query string.
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Source value that maps to [`SourceClass::Reddit`].
pub const REDDIT_SOURCE: &str = "reddit";

/// Which averaging class a post's source belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum SourceClass {
    /// Engagement-weighted social posts.
    Reddit,
    /// Everything else, averaged with unit weight; the outlet keeps the
    /// original source name so folded-in sources stay visible.
    News { outlet: String },
}

impl SourceClass {
    pub fn classify(source: &str) -> Self {
        if source == REDDIT_SOURCE {
            SourceClass::Reddit
        } else {
            SourceClass::News {
                outlet: source.to_string(),
            }
        }
    }

    /// Weight this class assigns to a stored engagement value.
    pub fn weight(&self, engagement: Option<i64>) -> u64 {
        match self {
            SourceClass::Reddit => engagement.unwrap_or(1).max(1) as u64,
            SourceClass::News { .. } => 1,
        }
    }
}

/// Per-day `(score, weight)` pairs, split by class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyBucket {
    pub reddit: Vec<(f64, u64)>,
    pub news: Vec<(f64, u64)>,
    pub news_outlets: BTreeMap<String, usize>,
}

impl DailyBucket {
    pub fn push(&mut self, class: SourceClass, score: f64, weight: u64) {
        match class {
            SourceClass::Reddit => self.reddit.push((score, weight)),
            SourceClass::News { outlet } => {
                self.news.push((score, weight));
                *self.news_outlets.entry(outlet).or_insert(0) += 1;
            }
        }
    }

    pub fn summarize(&self, date: NaiveDate) -> DailySummary {
        let combined: Vec<(f64, u64)> = self.reddit.iter().chain(self.news.iter()).copied().collect();
        DailySummary {
            date,
            reddit_avg: weighted_average(&self.reddit),
            news_avg: weighted_average(&self.news),
            combined_avg: weighted_average(&combined),
            reddit_count: self.reddit.len(),
            news_count: self.news.len(),
            total_count: combined.len(),
            news_outlets: self.news_outlets.clone(),
        }
    }
}

/// One day of the aggregate series; also exactly what a chart needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub reddit_avg: f64,
    pub news_avg: f64,
    pub combined_avg: f64,
    pub reddit_count: usize,
    pub news_count: usize,
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub news_outlets: BTreeMap<String, usize>,
}

/// Weighted mean of `(value, weight)` pairs. Empty input or zero total weight yields `0.0`.
pub fn weighted_average(pairs: &[(f64, u64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let total_weight: u64 = pairs.iter().map(|&(_, w)| w).sum();
    if total_weight == 0 {
        return 0.0;
    }
    let sum: f64 = pairs.iter().map(|&(v, w)| v * w as f64).sum();
    sum / total_weight as f64
}

/// Partition observations into day buckets (ascending by date).
pub fn partition(observations: &[ScoredObservation]) -> BTreeMap<NaiveDate, DailyBucket> {
    let mut days: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();
    for obs in observations {
        let class = SourceClass::classify(&obs.source);
        let weight = class.weight(obs.weight);
        days.entry(obs.date)
            .or_default()
            .push(class, obs.sentiment, weight);
    }
    days
}

/// One summary per day present, oldest first.
pub fn aggregate(observations: &[ScoredObservation]) -> Vec<DailySummary> {
    partition(observations)
        .iter()
        .map(|(date, bucket)| bucket.summarize(*date))
        .collect()
}

/// First day included in a trailing window ending at `now`.
///
/// Saturates at `NaiveDate::MIN` when the window reaches past chrono's range.
pub fn window_cutoff(now: DateTime<Utc>, window_days: u32) -> NaiveDate {
    now.date_naive()
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Daily series for the trailing window ending at `now`.
pub async fn daily_sentiment_at(
    store: &dyn PostStore,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DailySummary>> {
    let cutoff = window_cutoff(now, window_days);
    let observations = store.scored_since(cutoff).await?;
    let daily = aggregate(&observations);
    debug!(
        %cutoff,
        observations = observations.len(),
        days = daily.len(),
        "aggregated daily sentiment"
    );
    Ok(daily)
}

/// Daily series for the trailing `window_days` ending now.
pub async fn get_daily_sentiment(store: &dyn PostStore, window_days: u32) -> Result<Vec<DailySummary>> {
    daily_sentiment_at(store, window_days, Utc::now()).await
}
