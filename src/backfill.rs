//! Backfill Step: score every post whose sentiment is still NULL.
//!
//! Posts are scored one at a time and written back in a single batch, so a
//! second run right after the first finds nothing to do.

use anyhow::{Context, Result};
use metrics::counter;
use tracing::{debug, info};

use crate::sentiment::SentimentScorer;
use crate::store::PostStore;

/// Returns the number of posts scored.
pub async fn backfill_sentiment(store: &dyn PostStore, scorer: &dyn SentimentScorer) -> Result<usize> {
    let rows = store
        .unscored_posts()
        .await
        .context("loading unscored posts")?;
    if rows.is_empty() {
        info!("no posts need sentiment scoring");
        return Ok(0);
    }

    let scores: Vec<(i64, f64)> = rows
        .iter()
        .map(|row| {
            let score = scorer.score(&row.title, &row.content);
            debug!(post_id = row.id, score, "scored post");
            (row.id, score)
        })
        .collect();

    let written = store
        .write_sentiments(&scores)
        .await
        .context("writing sentiment scores")?;

    counter!("backfill_scored_total").increment(written as u64);
    info!(scored = written, "backfilled sentiment");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryPostStore, NewPost};

    struct FixedScorer(f64);

    impl SentimentScorer for FixedScorer {
        fn score(&self, _title: &str, _content: &str) -> f64 {
            self.0
        }
    }

    #[tokio::test]
    async fn second_run_scores_nothing() {
        let store = InMemoryPostStore::new();
        store
            .insert_posts(&[
                NewPost::new("reddit", "a", "one", ""),
                NewPost::new("news", "b", "two", ""),
            ])
            .await
            .unwrap();

        let scorer = FixedScorer(0.4);
        assert_eq!(backfill_sentiment(&store, &scorer).await.unwrap(), 2);
        assert_eq!(backfill_sentiment(&store, &scorer).await.unwrap(), 0);

        store
            .insert_posts(&[NewPost::new("news", "c", "three", "")])
            .await
            .unwrap();
        assert_eq!(backfill_sentiment(&store, &scorer).await.unwrap(), 1);
    }
}
