// src/store/mod.rs
//! # Post Store
//! Durable table of crawled posts keyed by `(source, external_id)`.
//!
//! The aggregation core only ever talks to the [`PostStore`] trait; the
//! SQLite implementation is what the binaries use, the in-memory one backs
//! tests and dry runs.

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryPostStore;
pub use sqlite::SqlitePostStore;

/// Post as produced by a crawler, before it has an id or a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub source: String,      // "reddit", "news", ...
    pub external_id: String, // unique per source
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub subreddit: Option<String>,
    /// Upvotes for reddit; `None` for sources without an engagement signal.
    pub engagement: Option<i64>,
    pub num_comments: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(
        source: impl Into<String>,
        external_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            title: title.into(),
            content: content.into(),
            author: None,
            url: None,
            subreddit: None,
            engagement: None,
            num_comments: None,
            published_at: None,
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn engagement(mut self, upvotes: i64) -> Self {
        self.engagement = Some(upvotes);
        self
    }
}

/// Row handed to the Backfill Step.
#[derive(Debug, Clone, PartialEq)]
pub struct UnscoredPost {
    pub id: i64,
    pub title: String,
    pub content: String,
}

/// One scored post reduced to what the Daily Aggregator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredObservation {
    /// UTC calendar day of the published timestamp.
    pub date: NaiveDate,
    pub source: String,
    pub sentiment: f64,
    /// Raw engagement weight; absent means 1.
    pub weight: Option<i64>,
}

/// Post as read back for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: i64,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub engagement: Option<i64>,
    pub sentiment: Option<f64>,
    pub published_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert every post whose `(source, external_id)` is not stored yet.
    /// Returns the number of new rows.
    async fn insert_posts(&self, posts: &[NewPost]) -> Result<usize>;

    /// All posts whose sentiment is still NULL.
    async fn unscored_posts(&self) -> Result<Vec<UnscoredPost>>;

    async fn write_sentiment(&self, id: i64, score: f64) -> Result<()>;

    /// Write a batch of scores. Implementations commit once for the whole batch.
    async fn write_sentiments(&self, scores: &[(i64, f64)]) -> Result<usize> {
        for &(id, score) in scores {
            self.write_sentiment(id, score).await?;
        }
        Ok(scores.len())
    }

    /// Scored posts whose published timestamp is on or after `cutoff`.
    /// Posts without a parseable published date are never returned.
    async fn scored_since(&self, cutoff: NaiveDate) -> Result<Vec<ScoredObservation>>;

    async fn post_counts(&self) -> Result<BTreeMap<String, i64>>;

    /// Newest first, optionally filtered by source.
    async fn recent_posts(&self, source: Option<&str>, limit: usize) -> Result<Vec<StoredPost>>;
}

/// Storage format of `published_at`: RFC 3339 in UTC, so that lexical order
/// equals chronological order and `YYYY-MM-DD` prefixes compare correctly.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY-MM-DD`, the form cutoffs are compared in.
pub fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexically_against_date_cutoff() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 3, 0, 0, 5).unwrap();
        let s = format_timestamp(&ts);
        assert_eq!(s, "2026-10-03T00:00:05Z");

        let same_day = NaiveDate::from_ymd_opt(2026, 10, 3).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2026, 10, 4).unwrap();
        assert!(s.as_str() >= format_date(&same_day).as_str());
        assert!(s.as_str() < format_date(&next_day).as_str());
    }

    #[test]
    fn parse_timestamp_roundtrips_and_rejects_garbage() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), Some(ts));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
