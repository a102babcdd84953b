//! Text reports for the CLI: the analysis banner + daily table, the recent
//! posts listing, and per-source totals.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;

use crate::backfill::backfill_sentiment;
use crate::predict::{predict_trend_window, Prediction};
use crate::sentiment::SentimentScorer;
use crate::store::{PostStore, StoredPost};

const RULE_WIDTH: usize = 60;
const TITLE_CHARS: usize = 80;

#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisReport {
    pub scored: usize,
    pub prediction: Prediction,
}

/// Score outstanding posts, then predict over the trailing window.
pub async fn run_analysis(
    store: &dyn PostStore,
    scorer: &dyn SentimentScorer,
    window_days: u32,
) -> Result<AnalysisReport> {
    let scored = backfill_sentiment(store, scorer).await?;
    let prediction = predict_trend_window(store, window_days).await?;
    Ok(AnalysisReport { scored, prediction })
}

pub fn render_report(ticker: &str, report: &AnalysisReport) -> String {
    let p = &report.prediction;
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "Sentiment scoring: {} posts scored.\n", report.scored);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  {ticker} PREDICTION: {}", p.direction);
    let _ = writeln!(out, "  Confidence: {}/10", p.confidence);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "\n{}\n", p.summary);

    if p.daily_scores.is_empty() {
        let _ = writeln!(out, "No data available for the daily series.");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<10}  {:>8}  {:>8}  {:>8}  {:>6}  {:>6}  {:>6}",
        "date", "combined", "reddit", "news", "n_red", "n_news", "total"
    );
    for d in &p.daily_scores {
        let _ = writeln!(
            out,
            "{:<10}  {:>+8.3}  {:>+8.3}  {:>+8.3}  {:>6}  {:>6}  {:>6}",
            d.date, d.combined_avg, d.reddit_avg, d.news_avg, d.reddit_count, d.news_count, d.total_count
        );
    }
    out
}

/// `Total posts: N (news: a, reddit: b)`
pub fn render_totals(counts: &BTreeMap<String, i64>) -> String {
    let total: i64 = counts.values().sum();
    let parts: Vec<String> = counts.iter().map(|(s, c)| format!("{s}: {c}")).collect();
    format!("Total posts: {total} ({})", parts.join(", "))
}

pub fn render_posts(posts: &[StoredPost], counts: &BTreeMap<String, i64>) -> String {
    if posts.is_empty() {
        return "No posts found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", render_totals(counts));
    for p in posts {
        let date = p
            .published_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let title: String = p.title.chars().take(TITLE_CHARS).collect();
        let pts = p
            .engagement
            .map(|e| format!(" [{e} pts]"))
            .unwrap_or_default();
        let _ = writeln!(out, "[{:<8}] {date}  {title}{pts}", p.source);
        let _ = writeln!(out, "           {}\n", p.url.as_deref().unwrap_or(""));
    }
    out
}
