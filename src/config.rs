// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_CONFIG_PATH: &str = "CHATTER_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/chatter.toml";
pub const DEFAULT_JSON_PATH: &str = "config/chatter.json";
/// One week; longer intervals are clamped.
pub const MAX_CRAWL_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Runtime settings shared by the server and the CLI.
///
/// Resolution order: built-in defaults, then a TOML/JSON file, then env vars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ticker: String,
    pub db_path: PathBuf,
    pub search_terms: Vec<String>,
    pub subreddits: Vec<String>,
    pub news_keywords: Vec<String>,
    /// Sent by every crawler HTTP client (reddit and news feeds).
    #[serde(alias = "reddit_user_agent")]
    pub user_agent: String,
    pub crawl_interval_minutes: u64,
    pub request_timeout_secs: u64,
    pub request_pause_ms: u64,
    pub window_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticker: "NVDA".into(),
            db_path: PathBuf::from("chatter.db"),
            search_terms: strings(&["NVDA", "nvidia", "nvidia stock"]),
            subreddits: strings(&[
                "wallstreetbets",
                "stocks",
                "investing",
                "nvidia",
                "stockmarket",
            ]),
            news_keywords: strings(&["nvda", "nvidia", "geforce", "jensen"]),
            user_agent: "ChatterSentiment/1.0".into(),
            crawl_interval_minutes: 720,
            request_timeout_secs: 15,
            request_pause_ms: 1000,
            window_days: crate::aggregate::DEFAULT_WINDOW_DAYS,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl AppConfig {
    /// Defaults overlaid by an explicit file, then by env vars.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(path)?;
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    /// Config using env var + fallbacks:
    /// 1) $CHATTER_CONFIG_PATH
    /// 2) config/chatter.toml
    /// 3) config/chatter.json
    /// 4) defaults only
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing json config {}", path.display())),
            "toml" => toml::from_str(&content)
                .with_context(|| format!("parsing toml config {}", path.display())),
            _ => toml::from_str(&content)
                .or_else(|_| serde_json::from_str(&content))
                .map_err(|_| anyhow!("unsupported config format: {}", path.display())),
        }
    }

    /// Overlay values from `lookup` (normally the process env).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = non_blank(lookup("CHATTER_TICKER")) {
            self.ticker = v.to_uppercase();
        }
        if let Some(v) = non_blank(lookup("CHATTER_DB")) {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = non_blank(lookup("CHATTER_SEARCH_TERMS")) {
            self.search_terms = split_list(&v);
        }
        if let Some(v) = non_blank(lookup("CHATTER_SUBREDDITS")) {
            self.subreddits = split_list(&v);
        }
        if let Some(v) = non_blank(lookup("CHATTER_NEWS_KEYWORDS")) {
            self.news_keywords = split_list(&v);
        }
        if let Some(v) = non_blank(lookup("CHATTER_USER_AGENT")) {
            self.user_agent = v;
        }
        parse_env_into(&lookup, "CRAWL_INTERVAL", &mut self.crawl_interval_minutes);
        parse_env_into(&lookup, "CHATTER_REQUEST_TIMEOUT", &mut self.request_timeout_secs);
        parse_env_into(&lookup, "CHATTER_REQUEST_PAUSE_MS", &mut self.request_pause_ms);
        parse_env_into(&lookup, "CHATTER_WINDOW_DAYS", &mut self.window_days);
    }

    /// Clamp values that would stall the scheduler or empty the window.
    pub fn sanitize(&mut self) {
        self.crawl_interval_minutes = self
            .crawl_interval_minutes
            .clamp(1, MAX_CRAWL_INTERVAL_MINUTES);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.window_days = self
            .window_days
            .clamp(1, crate::aggregate::MAX_WINDOW_DAYS);
        if self.user_agent.trim().is_empty() {
            self.user_agent = Self::default().user_agent;
        }
        if self.ticker.trim().is_empty() {
            self.ticker = Self::default().ticker;
        }
        self.search_terms = clean_list(std::mem::take(&mut self.search_terms));
        self.subreddits = clean_list(std::mem::take(&mut self.subreddits));
        self.news_keywords = clean_list(std::mem::take(&mut self.news_keywords));
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_env_into<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = non_blank(lookup(key)) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "invalid numeric env value, keeping previous"),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(|p| p.to_string()).collect()
}

/// Trim, drop empties, keep first occurrence order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
