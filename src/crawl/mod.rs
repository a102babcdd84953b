// src/crawl/mod.rs
pub mod providers;
pub mod types;

use crate::config::AppConfig;
use crate::crawl::providers::{news_rss::NewsRssCrawler, reddit::RedditCrawler};
use crate::crawl::types::{CrawlReport, Crawler};
use crate::store::PostStore;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// Upper bound on stored post content, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crawl_posts_fetched_total", "Posts returned by crawlers.");
        describe_counter!(
            "crawl_posts_inserted_total",
            "Posts that were new to the store."
        );
        describe_counter!("crawl_errors_total", "Crawler fetch/parse failures.");
        describe_histogram!("crawl_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("crawl_last_run_ts", "Unix ts when crawlers last ran.");
        describe_counter!("crawl_cycles_total", "Scheduler crawl cycles run.");
        describe_counter!("backfill_scored_total", "Posts scored by the backfill step.");
        describe_gauge!("prediction_confidence", "Confidence of the latest prediction.");
        describe_counter!("prediction_runs_total", "Predictions computed, by direction.");
    });
}

/// Normalize crawled text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags =
        RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("valid tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("valid ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_CONTENT_CHARS {
        out = out.chars().take(MAX_CONTENT_CHARS).collect();
    }

    out
}

/// Crawlers configured for the tracked ticker.
pub fn default_crawlers(cfg: &AppConfig) -> anyhow::Result<Vec<Box<dyn Crawler>>> {
    Ok(vec![
        Box::new(RedditCrawler::from_config(cfg)?),
        Box::new(NewsRssCrawler::from_config(cfg)?),
    ])
}

/// Run every crawler once and insert what they return.
///
/// A failing crawler is logged, counted, and treated as zero posts; the
/// remaining crawlers still run.
pub async fn run_crawlers(crawlers: &[Box<dyn Crawler>], store: &dyn PostStore) -> CrawlReport {
    ensure_metrics_described();

    let mut report = CrawlReport::default();
    for c in crawlers {
        let posts = match c.crawl().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, crawler = c.name(), "crawler failed");
                counter!("crawl_errors_total", "crawler" => c.name()).increment(1);
                report.failed.push(c.name());
                continue;
            }
        };

        match store.insert_posts(&posts).await {
            Ok(new_count) => {
                tracing::info!(
                    target: "crawl",
                    crawler = c.name(),
                    fetched = posts.len(),
                    new = new_count,
                    "crawler finished"
                );
                report.fetched += posts.len();
                report.inserted += new_count;
            }
            Err(e) => {
                tracing::warn!(error = ?e, crawler = c.name(), "storing crawled posts failed");
                counter!("crawl_errors_total", "crawler" => c.name()).increment(1);
                report.failed.push(c.name());
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0);
    counter!("crawl_posts_fetched_total").increment(report.fetched as u64);
    counter!("crawl_posts_inserted_total").increment(report.inserted as u64);
    gauge!("crawl_last_run_ts").set(now as f64);
    tracing::info!(
        target: "crawl",
        fetched = report.fetched,
        inserted = report.inserted,
        failed = report.failed.len(),
        "crawl complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_collapses_ws() {
        let s = "  <p>Nvidia&nbsp;&nbsp;beats</p><b>estimates</b>  ";
        assert_eq!(normalize_text(s), "Nvidia beats estimates");
    }

    #[test]
    fn normalize_text_keeps_punctuation_and_caps_length() {
        assert_eq!(normalize_text("“Huge” quarter!"), "\"Huge\" quarter!");
        let long = "x".repeat(MAX_CONTENT_CHARS + 50);
        assert_eq!(normalize_text(&long).chars().count(), MAX_CONTENT_CHARS);
    }
}
