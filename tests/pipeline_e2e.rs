// tests/pipeline_e2e.rs
//
// Insert -> backfill -> aggregate -> predict, against both store backends.

use chrono::{Duration, Utc};

use chatter_sentiment::aggregate::get_daily_sentiment;
use chatter_sentiment::backfill::backfill_sentiment;
use chatter_sentiment::predict::{predict_trend, Direction};
use chatter_sentiment::sentiment::SentimentScorer;
use chatter_sentiment::store::{InMemoryPostStore, NewPost, PostStore, SqlitePostStore};

/// Scores by keyword so the expected series is exact.
struct KeywordScorer;

impl SentimentScorer for KeywordScorer {
    fn score(&self, title: &str, _content: &str) -> f64 {
        if title.contains("up") {
            0.6
        } else if title.contains("down") {
            -0.4
        } else {
            0.0
        }
    }
}

fn two_weeks_of_posts() -> Vec<NewPost> {
    let now = Utc::now();
    let mut posts = Vec::new();
    // last week: gloomy reddit, 8..=12 days ago
    for d in 8..=12 {
        posts.push(
            NewPost::new("reddit", format!("old{d}"), "nvda down again", "")
                .published(now - Duration::days(d))
                .engagement(3),
        );
    }
    // this week: upbeat on both classes, 1..=3 days ago
    for d in 1..=3 {
        posts.push(
            NewPost::new("reddit", format!("new{d}"), "nvda up big", "")
                .published(now - Duration::days(d))
                .engagement(10),
        );
        posts.push(
            NewPost::new("news", format!("wire{d}"), "chips up", "")
                .published(now - Duration::days(d)),
        );
    }
    // undated and out-of-window posts never reach the series
    posts.push(NewPost::new("news", "undated", "up up up", ""));
    posts.push(
        NewPost::new("reddit", "ancient", "down", "").published(now - Duration::days(40)),
    );
    posts
}

async fn run_pipeline(store: &dyn PostStore) {
    let inserted = store.insert_posts(&two_weeks_of_posts()).await.unwrap();
    assert_eq!(inserted, 13);

    let scored = backfill_sentiment(store, &KeywordScorer).await.unwrap();
    assert_eq!(scored, 13);
    assert_eq!(backfill_sentiment(store, &KeywordScorer).await.unwrap(), 0);

    let daily = get_daily_sentiment(store, 14).await.unwrap();
    assert_eq!(daily.len(), 8);
    for d in &daily {
        assert_eq!(d.reddit_count + d.news_count, d.total_count);
    }
    assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!(get_daily_sentiment(store, 14).await.unwrap(), daily);

    let recent = daily.last().unwrap();
    assert_eq!(recent.reddit_count, 1);
    assert_eq!(recent.news_count, 1);
    assert!((recent.combined_avg - 0.6).abs() < 1e-9);

    let p = predict_trend(store).await.unwrap();
    assert_eq!(p.direction, Direction::Bullish);
    assert_eq!(p.confidence, 10);
    let s = p.signals.expect("signals on the full path");
    assert!((s.momentum - 1.0).abs() < 1e-9);
    assert_eq!(s.this_week_count, 6);
    assert_eq!(s.last_week_count, 5);
    assert_eq!(s.agreement, 1.0);
    assert!(p.summary.starts_with("Bullish outlook (confidence: 10/10)."));
}

#[tokio::test]
async fn pipeline_in_memory_store() {
    let store = InMemoryPostStore::new();
    run_pipeline(&store).await;
}

#[tokio::test]
async fn pipeline_sqlite_store() {
    let store = SqlitePostStore::in_memory().await.unwrap();
    run_pipeline(&store).await;
}

#[tokio::test]
async fn sqlite_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatter.db");
    let path = path.to_string_lossy();

    {
        let store = SqlitePostStore::open(&path).await.unwrap();
        store.insert_posts(&two_weeks_of_posts()).await.unwrap();
    }
    let reopened = SqlitePostStore::open(&path).await.unwrap();
    assert_eq!(reopened.insert_posts(&two_weeks_of_posts()).await.unwrap(), 0);
    assert_eq!(reopened.unscored_posts().await.unwrap().len(), 13);
}
