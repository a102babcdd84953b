//! # Trend Predictor
//! Pure, testable logic that maps the daily sentiment series → `Prediction`.
//! No I/O apart from the `predict_trend` wrapper that fetches the window.
//!
//! Policy: the window is split at `now - 7 days` into this week and last
//! week. Direction needs both momentum and the current level past ±0.05.
//! Confidence (1..=10) blends momentum magnitude, volume trend, reddit/news
//! agreement, and raw post count, each capped separately.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{daily_sentiment_at, DailySummary, DEFAULT_WINDOW_DAYS};
use crate::store::PostStore;

/// Length of the "this week" window in days.
pub const WEEK_DAYS: i64 = 7;
/// Momentum and level threshold for a directional call.
pub const DIRECTION_THRESHOLD: f64 = 0.05;
pub const INSUFFICIENT_DATA: &str = "insufficient data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Bullish => "Bullish",
            Direction::Bearish => "Bearish",
            Direction::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Rising,
    Falling,
    Steady,
}

impl VolumeTrend {
    pub fn from_ratio(volume_ratio: f64) -> Self {
        if volume_ratio > 1.2 {
            VolumeTrend::Rising
        } else if volume_ratio < 0.8 {
            VolumeTrend::Falling
        } else {
            VolumeTrend::Steady
        }
    }
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolumeTrend::Rising => "rising",
            VolumeTrend::Falling => "falling",
            VolumeTrend::Steady => "steady",
        };
        f.write_str(s)
    }
}

/// Intermediate numbers of a full evaluation, kept for explainability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignals {
    pub this_week_avg: f64,
    pub last_week_avg: f64,
    pub momentum: f64,
    pub this_week_count: usize,
    pub last_week_count: usize,
    pub volume_ratio: f64,
    pub volume_trend: VolumeTrend,
    pub reddit_dir: f64,
    pub news_dir: f64,
    pub agreement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub direction: Direction,
    /// Integer in `1..=10`.
    pub confidence: u8,
    pub summary: String,
    /// Absent on the insufficient-data path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<TrendSignals>,
    pub daily_scores: Vec<DailySummary>,
}

/// Unweighted mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// First day of "this week" relative to the wall clock, not to the data.
pub fn week_boundary(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::days(WEEK_DAYS)).date_naive()
}

/// Split into (this_week, last_week) by date against `boundary`.
pub fn split_weeks(
    daily: &[DailySummary],
    boundary: NaiveDate,
) -> (Vec<&DailySummary>, Vec<&DailySummary>) {
    daily.iter().partition(|d| d.date >= boundary)
}

pub fn direction_for(momentum: f64, this_week_avg: f64) -> Direction {
    if momentum > DIRECTION_THRESHOLD && this_week_avg > DIRECTION_THRESHOLD {
        Direction::Bullish
    } else if momentum < -DIRECTION_THRESHOLD && this_week_avg < -DIRECTION_THRESHOLD {
        Direction::Bearish
    } else {
        Direction::Neutral
    }
}

/// `1.0` when both directions share a sign class (zero counts as non-negative), else `0.5`.
pub fn agreement(reddit_dir: f64, news_dir: f64) -> f64 {
    if (reddit_dir >= 0.0) == (news_dir >= 0.0) {
        1.0
    } else {
        0.5
    }
}

pub fn volume_ratio(this_week_count: usize, last_week_count: usize) -> f64 {
    this_week_count as f64 / last_week_count.max(1) as f64
}

/// `clamp(floor(|momentum|*20 + min(ratio,3)*1.5 + agreement*2 + min(count,50)*0.05), 1, 10)`.
pub fn confidence(momentum: f64, volume_ratio: f64, agreement: f64, this_week_count: usize) -> u8 {
    let raw = momentum.abs() * 20.0
        + volume_ratio.min(3.0) * 1.5
        + agreement * 2.0
        + this_week_count.min(50) as f64 * 0.05;
    (raw.floor() as i64).clamp(1, 10) as u8
}

fn summarize(direction: Direction, confidence: u8, s: &TrendSignals) -> String {
    format!(
        "{direction} outlook (confidence: {confidence}/10). \
         Sentiment momentum: {:+.3} (this week: {:.3}, last week: {:.3}). \
         Post volume is {} ({} vs {} posts). \
         Reddit sentiment: {:.3}, News sentiment: {:.3}.",
        s.momentum,
        s.this_week_avg,
        s.last_week_avg,
        s.volume_trend,
        s.this_week_count,
        s.last_week_count,
        s.reddit_dir,
        s.news_dir,
    )
}

/// Evaluate the daily series as of `now`.
pub fn predict(daily: Vec<DailySummary>, now: DateTime<Utc>) -> Prediction {
    // 1) Terminal path: not enough points for two windows.
    if daily.len() < 2 {
        return Prediction {
            direction: Direction::Neutral,
            confidence: 1,
            summary: INSUFFICIENT_DATA.to_string(),
            signals: None,
            daily_scores: daily,
        };
    }

    // 2) Window split (mean of daily means per window)
    let (this_week, last_week) = split_weeks(&daily, week_boundary(now));
    let combined = |w: &[&DailySummary]| w.iter().map(|d| d.combined_avg).collect::<Vec<_>>();
    let this_week_avg = mean(&combined(this_week.as_slice()));
    let last_week_avg = mean(&combined(last_week.as_slice()));
    let momentum = this_week_avg - last_week_avg;

    // 3) Volume
    let this_week_count: usize = this_week.iter().map(|d| d.total_count).sum();
    let last_week_count: usize = last_week.iter().map(|d| d.total_count).sum();
    let ratio = volume_ratio(this_week_count, last_week_count);

    // 4) Source agreement over days where each class actually posted
    let reddit_avgs: Vec<f64> = this_week
        .iter()
        .filter(|d| d.reddit_count > 0)
        .map(|d| d.reddit_avg)
        .collect();
    let news_avgs: Vec<f64> = this_week
        .iter()
        .filter(|d| d.news_count > 0)
        .map(|d| d.news_avg)
        .collect();
    let reddit_dir = mean(&reddit_avgs);
    let news_dir = mean(&news_avgs);
    let agree = agreement(reddit_dir, news_dir);

    let direction = direction_for(momentum, this_week_avg);
    let confidence = confidence(momentum, ratio, agree, this_week_count);

    let signals = TrendSignals {
        this_week_avg,
        last_week_avg,
        momentum,
        this_week_count,
        last_week_count,
        volume_ratio: ratio,
        volume_trend: VolumeTrend::from_ratio(ratio),
        reddit_dir,
        news_dir,
        agreement: agree,
    };
    let summary = summarize(direction, confidence, &signals);

    Prediction {
        direction,
        confidence,
        summary,
        signals: Some(signals),
        daily_scores: daily,
    }
}

/// Fetch the default 14-day window and evaluate it against the current time.
pub async fn predict_trend(store: &dyn PostStore) -> Result<Prediction> {
    predict_trend_window(store, DEFAULT_WINDOW_DAYS).await
}

/// Same as [`predict_trend`] with a configurable window.
pub async fn predict_trend_window(store: &dyn PostStore, window_days: u32) -> Result<Prediction> {
    let now = Utc::now();
    let daily = daily_sentiment_at(store, window_days, now).await?;
    let prediction = predict(daily, now);

    gauge!("prediction_confidence").set(f64::from(prediction.confidence));
    counter!("prediction_runs_total", "direction" => prediction.direction.to_string()).increment(1);
    info!(
        direction = %prediction.direction,
        confidence = prediction.confidence,
        days = prediction.daily_scores.len(),
        "trend prediction"
    );
    Ok(prediction)
}
