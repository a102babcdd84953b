// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - GET  /posts, /posts/counts
// - POST /admin/backfill
// - GET  /sentiment/daily, /prediction

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use chatter_sentiment::sentiment::LexiconScorer;
use chatter_sentiment::store::{InMemoryPostStore, NewPost, PostStore};
use chatter_sentiment::{create_router, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

fn router_over(store: Arc<InMemoryPostStore>) -> Router {
    create_router(AppState {
        store,
        scorer: Arc::new(LexiconScorer::new()),
        window_days: 14,
    })
}

async fn seeded_store() -> Arc<InMemoryPostStore> {
    let store = Arc::new(InMemoryPostStore::new());
    let now = Utc::now();
    let posts = vec![
        NewPost::new("reddit", "r1", "NVDA rally, strong beat", "")
            .published(now - Duration::days(1))
            .engagement(50),
        NewPost::new("reddit", "r2", "nvidia crash incoming", "")
            .published(now - Duration::days(9)),
        NewPost::new("news", "n1", "Nvidia gains on record revenue", "")
            .published(now - Duration::days(2)),
    ];
    store.insert_posts(&posts).await.expect("seed posts");
    store
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot GET");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = router_over(Arc::new(InMemoryPostStore::new()));
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
}

#[tokio::test]
async fn posts_endpoints_filter_and_count() {
    let app = router_over(seeded_store().await);

    let (status, body) = get(app.clone(), "/posts/counts").await;
    assert_eq!(status, StatusCode::OK);
    let counts: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(counts["reddit"], 2);
    assert_eq!(counts["news"], 1);

    let (status, body) = get(app.clone(), "/posts?source=reddit&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let posts: Vec<Json> = serde_json::from_slice(&body).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["external_id"], "r1", "newest reddit post first");

    let (_, body) = get(app, "/posts").await;
    let all: Vec<Json> = serde_json::from_slice(&body).unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn backfill_then_daily_and_prediction() {
    let app = router_over(seeded_store().await);

    // nothing scored yet -> empty series
    let (_, body) = get(app.clone(), "/sentiment/daily").await;
    let daily: Vec<Json> = serde_json::from_slice(&body).unwrap();
    assert!(daily.is_empty());

    let req = Request::builder()
        .method("POST")
        .uri("/admin/backfill")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["scored"], 3);

    let (status, body) = get(app.clone(), "/sentiment/daily?days=14").await;
    assert_eq!(status, StatusCode::OK);
    let daily: Vec<Json> = serde_json::from_slice(&body).unwrap();
    assert_eq!(daily.len(), 3);
    let dates: Vec<&str> = daily.iter().map(|d| d["date"].as_str().unwrap()).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted, "days ascending");

    // a 3-day window only sees the two recent posts
    let (_, body) = get(app.clone(), "/sentiment/daily?days=3").await;
    let recent: Vec<Json> = serde_json::from_slice(&body).unwrap();
    assert_eq!(recent.len(), 2);

    let (status, body) = get(app, "/prediction").await;
    assert_eq!(status, StatusCode::OK);
    let p: Json = serde_json::from_slice(&body).unwrap();
    let confidence = p["confidence"].as_u64().unwrap();
    assert!((1..=10).contains(&confidence));
    assert!(p["summary"].as_str().unwrap().contains("outlook (confidence:"));
    assert_eq!(p["daily_scores"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn prediction_with_no_data_is_neutral() {
    let app = router_over(Arc::new(InMemoryPostStore::new()));
    let (status, body) = get(app, "/prediction").await;
    assert_eq!(status, StatusCode::OK);
    let p: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(p["direction"], "Neutral");
    assert_eq!(p["confidence"], 1);
    assert_eq!(p["summary"], "insufficient data");
    assert!(p.get("signals").is_none());
}

#[tokio::test]
async fn huge_days_query_is_clamped_not_fatal() {
    let store = seeded_store().await;
    let scores: Vec<(i64, f64)> = store
        .unscored_posts()
        .await
        .unwrap()
        .iter()
        .map(|u| (u.id, 0.1))
        .collect();
    store.write_sentiments(&scores).await.unwrap();
    let app = router_over(store);

    let (status, body) = get(app, "/sentiment/daily?days=4000000000").await;
    assert_eq!(status, StatusCode::OK);
    let daily: Vec<Json> = serde_json::from_slice(&body).unwrap();
    assert_eq!(daily.len(), 3, "a ten-year window still covers every seeded day");
}
