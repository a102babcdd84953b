//! In-memory post store for tests and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use super::{NewPost, PostStore, ScoredObservation, StoredPost, UnscoredPost};

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    post: NewPost,
    sentiment: Option<f64>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<Row>,
    keys: HashSet<(String, String)>,
    next_id: i64,
}

/// Thread-safe `Vec`-backed store with the same uniqueness rule as the SQLite table.
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    inner: Mutex<Inner>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("post store mutex poisoned"))
    }

    /// Number of stored rows (scored or not).
    pub fn len(&self) -> usize {
        self.lock().map(|g| g.rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn insert_posts(&self, posts: &[NewPost]) -> Result<usize> {
        let mut g = self.lock()?;
        let mut inserted = 0usize;
        for p in posts {
            let key = (p.source.clone(), p.external_id.clone());
            if !g.keys.insert(key) {
                continue;
            }
            g.next_id += 1;
            let id = g.next_id;
            g.rows.push(Row {
                id,
                post: p.clone(),
                sentiment: None,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn unscored_posts(&self) -> Result<Vec<UnscoredPost>> {
        let g = self.lock()?;
        Ok(g.rows
            .iter()
            .filter(|r| r.sentiment.is_none())
            .map(|r| UnscoredPost {
                id: r.id,
                title: r.post.title.clone(),
                content: r.post.content.clone(),
            })
            .collect())
    }

    async fn write_sentiment(&self, id: i64, score: f64) -> Result<()> {
        let mut g = self.lock()?;
        if let Some(row) = g.rows.iter_mut().find(|r| r.id == id) {
            row.sentiment = Some(score);
        }
        Ok(())
    }

    async fn write_sentiments(&self, scores: &[(i64, f64)]) -> Result<usize> {
        // Single lock for the whole batch, mirroring the one-transaction SQLite path.
        let mut g = self.lock()?;
        let mut written = 0usize;
        for &(id, score) in scores {
            if let Some(row) = g.rows.iter_mut().find(|r| r.id == id) {
                row.sentiment = Some(score);
                written += 1;
            }
        }
        Ok(written)
    }

    async fn scored_since(&self, cutoff: NaiveDate) -> Result<Vec<ScoredObservation>> {
        let g = self.lock()?;
        let mut out: Vec<ScoredObservation> = g
            .rows
            .iter()
            .filter_map(|r| {
                let sentiment = r.sentiment?;
                let date = r.post.published_at?.date_naive();
                (date >= cutoff).then(|| ScoredObservation {
                    date,
                    source: r.post.source.clone(),
                    sentiment,
                    weight: r.post.engagement,
                })
            })
            .collect();
        out.sort_by_key(|o| o.date);
        Ok(out)
    }

    async fn post_counts(&self) -> Result<BTreeMap<String, i64>> {
        let g = self.lock()?;
        let mut counts = BTreeMap::new();
        for r in &g.rows {
            *counts.entry(r.post.source.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn recent_posts(&self, source: Option<&str>, limit: usize) -> Result<Vec<StoredPost>> {
        let g = self.lock()?;
        let mut rows: Vec<&Row> = g
            .rows
            .iter()
            .filter(|r| source.map_or(true, |s| r.post.source == s))
            .collect();
        // NULL dates sort last, like `ORDER BY published_at DESC` in SQLite.
        rows.sort_by(|a, b| b.post.published_at.cmp(&a.post.published_at));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|r| StoredPost {
                id: r.id,
                source: r.post.source.clone(),
                external_id: r.post.external_id.clone(),
                title: r.post.title.clone(),
                author: r.post.author.clone(),
                url: r.post.url.clone(),
                engagement: r.post.engagement,
                sentiment: r.sentiment,
                published_at: r.post.published_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(source: &str, id: &str, day: u32) -> NewPost {
        NewPost::new(source, id, format!("title {id}"), "")
            .published(Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn insert_ignores_duplicate_source_and_external_id() {
        let store = InMemoryPostStore::new();
        let n = store
            .insert_posts(&[post("reddit", "a", 1), post("reddit", "a", 2), post("news", "a", 1)])
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.insert_posts(&[post("reddit", "a", 3)]).await.unwrap(), 0);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn scored_since_skips_unscored_undated_and_old_rows() {
        let store = InMemoryPostStore::new();
        let undated = NewPost::new("news", "undated", "t", "c");
        store
            .insert_posts(&[post("reddit", "old", 1), post("reddit", "new", 10), undated])
            .await
            .unwrap();
        let ids: Vec<i64> = store.unscored_posts().await.unwrap().iter().map(|u| u.id).collect();
        store
            .write_sentiments(&ids.iter().map(|&id| (id, 0.5)).collect::<Vec<_>>())
            .await
            .unwrap();

        let cutoff = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
        let rows = store.scored_since(cutoff).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2026, 10, 10).unwrap());
    }

    #[tokio::test]
    async fn recent_posts_newest_first_with_source_filter() {
        let store = InMemoryPostStore::new();
        store
            .insert_posts(&[post("reddit", "a", 1), post("news", "b", 3), post("reddit", "c", 2)])
            .await
            .unwrap();
        let all = store.recent_posts(None, 10).await.unwrap();
        assert_eq!(
            all.iter().map(|p| p.external_id.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "a"]
        );
        let reddit = store.recent_posts(Some("reddit"), 1).await.unwrap();
        assert_eq!(reddit.len(), 1);
        assert_eq!(reddit[0].external_id, "c");
    }
}
