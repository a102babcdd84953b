use std::collections::BTreeMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::{get_daily_sentiment, DailySummary, MAX_WINDOW_DAYS};
use crate::backfill::backfill_sentiment;
use crate::predict::{predict_trend_window, Prediction};
use crate::sentiment::SentimentScorer;
use crate::store::{PostStore, StoredPost};

pub const DEFAULT_POST_LIMIT: usize = 20;
pub const MAX_POST_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub scorer: Arc<dyn SentimentScorer>,
    pub window_days: u32,
}

/// Any failure below the router surfaces as a 500 with the error chain as text.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(error = ?self.0, "api request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sentiment/daily", get(daily_sentiment))
        .route("/prediction", get(prediction))
        .route("/posts", get(recent_posts))
        .route("/posts/counts", get(post_counts))
        .route("/admin/backfill", post(admin_backfill))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct DailyQuery {
    days: Option<u32>,
}

async fn daily_sentiment(
    State(st): State<AppState>,
    Query(q): Query<DailyQuery>,
) -> ApiResult<Vec<DailySummary>> {
    let days = q.days.unwrap_or(st.window_days).clamp(1, MAX_WINDOW_DAYS);
    Ok(Json(get_daily_sentiment(st.store.as_ref(), days).await?))
}

async fn prediction(State(st): State<AppState>) -> ApiResult<Prediction> {
    Ok(Json(
        predict_trend_window(st.store.as_ref(), st.window_days).await?,
    ))
}

#[derive(serde::Deserialize)]
struct PostsQuery {
    source: Option<String>,
    limit: Option<usize>,
}

async fn recent_posts(
    State(st): State<AppState>,
    Query(q): Query<PostsQuery>,
) -> ApiResult<Vec<StoredPost>> {
    let limit = q.limit.unwrap_or(DEFAULT_POST_LIMIT).clamp(1, MAX_POST_LIMIT);
    let source = q.source.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(st.store.recent_posts(source, limit).await?))
}

async fn post_counts(State(st): State<AppState>) -> ApiResult<BTreeMap<String, i64>> {
    Ok(Json(st.store.post_counts().await?))
}

#[derive(serde::Serialize)]
struct BackfillResp {
    scored: usize,
}

async fn admin_backfill(State(st): State<AppState>) -> ApiResult<BackfillResp> {
    let scored = backfill_sentiment(st.store.as_ref(), st.scorer.as_ref()).await?;
    Ok(Json(BackfillResp { scored }))
}
