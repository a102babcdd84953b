// src/crawl/providers/reddit.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;

use super::from_unix_secs;
use crate::config::AppConfig;
use crate::crawl::normalize_text;
use crate::crawl::types::Crawler;
use crate::store::NewPost;

const SEARCH_LIMIT: &str = "25";

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    author: Option<String>,
    #[serde(default)]
    permalink: String,
    score: Option<i64>,
    num_comments: Option<i64>,
    created_utc: Option<f64>,
}

/// Searches each configured subreddit for each search term (newest posts of the last day).
pub struct RedditCrawler {
    mode: Mode,
}

enum Mode {
    /// `(subreddit, search.json body)` pairs, parsed as if fetched.
    Fixture(Vec<(String, String)>),
    Http {
        client: reqwest::Client,
        subreddits: Vec<String>,
        terms: Vec<String>,
        pause: Duration,
    },
}

impl RedditCrawler {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            mode: Mode::Http {
                client,
                subreddits: cfg.subreddits.clone(),
                terms: cfg.search_terms.clone(),
                pause: Duration::from_millis(cfg.request_pause_ms),
            },
        })
    }

    pub fn from_fixture(subreddit: &str, body: &str) -> Self {
        Self {
            mode: Mode::Fixture(vec![(subreddit.to_string(), body.to_string())]),
        }
    }

    /// Parse one `search.json` response body.
    pub fn parse_search(body: &str, subreddit: &str) -> Result<Vec<NewPost>> {
        let t0 = std::time::Instant::now();
        let listing: Listing = serde_json::from_str(body).context("parsing reddit search json")?;

        let mut out = Vec::with_capacity(listing.data.children.len());
        for child in listing.data.children {
            let p = child.data;
            if p.id.is_empty() {
                continue;
            }
            out.push(NewPost {
                source: "reddit".to_string(),
                external_id: p.id,
                title: normalize_text(&p.title),
                content: normalize_text(&p.selftext),
                author: p.author.filter(|a| !a.is_empty()),
                url: Some(format!("https://reddit.com{}", p.permalink)),
                subreddit: Some(subreddit.to_string()),
                engagement: Some(p.score.unwrap_or(0)),
                num_comments: Some(p.num_comments.unwrap_or(0)),
                published_at: p.created_utc.and_then(from_unix_secs),
            });
        }

        histogram!("crawl_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    async fn search(client: &reqwest::Client, subreddit: &str, term: &str) -> Result<String> {
        let url = format!("https://www.reddit.com/r/{subreddit}/search.json");
        let resp = client
            .get(&url)
            .query(&[
                ("q", term),
                ("sort", "new"),
                ("restrict_sr", "on"),
                ("limit", SEARCH_LIMIT),
                ("t", "day"),
            ])
            .send()
            .await
            .with_context(|| format!("reddit GET r/{subreddit}"))?
            .error_for_status()
            .with_context(|| format!("reddit status r/{subreddit}"))?;
        resp.text().await.context("reddit .text()")
    }
}

#[async_trait]
impl Crawler for RedditCrawler {
    async fn crawl(&self) -> Result<Vec<NewPost>> {
        match &self.mode {
            Mode::Fixture(pages) => {
                let mut out = Vec::new();
                for (sub, body) in pages {
                    out.extend(Self::parse_search(body, sub)?);
                }
                Ok(out)
            }

            Mode::Http {
                client,
                subreddits,
                terms,
                pause,
            } => {
                let mut out = Vec::new();
                let mut attempts = 0usize;
                let mut failures = 0usize;
                for sub in subreddits {
                    for term in terms {
                        attempts += 1;
                        let parsed = match Self::search(client, sub, term).await {
                            Ok(body) => Self::parse_search(&body, sub),
                            Err(e) => Err(e),
                        };
                        match parsed {
                            Ok(mut v) => out.append(&mut v),
                            Err(e) => {
                                failures += 1;
                                tracing::warn!(error = ?e, subreddit = %sub, term = %term, "reddit search failed");
                            }
                        }
                        // rate-limit courtesy
                        tokio::time::sleep(*pause).await;
                    }
                }
                if attempts > 0 && failures == attempts {
                    bail!("all {attempts} reddit searches failed");
                }
                tracing::info!(target: "crawl", posts = out.len(), "reddit fetched");
                Ok(out)
            }
        }
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_and_skips_children_without_id() {
        let body = r#"{"data":{"children":[
            {"data":{"id":"abc","title":"NVDA &amp; AI","selftext":"<b>calls</b>","author":"u1",
                     "permalink":"/r/stocks/comments/abc/x/","score":-4,"num_comments":2,
                     "created_utc":1760000000.0}},
            {"data":{"title":"no id"}}
        ]}}"#;
        let posts = RedditCrawler::parse_search(body, "stocks").unwrap();
        assert_eq!(posts.len(), 1);
        let p = &posts[0];
        assert_eq!(p.source, "reddit");
        assert_eq!(p.external_id, "abc");
        assert_eq!(p.title, "NVDA & AI");
        assert_eq!(p.content, "calls");
        assert_eq!(p.engagement, Some(-4));
        assert_eq!(p.url.as_deref(), Some("https://reddit.com/r/stocks/comments/abc/x/"));
        assert_eq!(p.subreddit.as_deref(), Some("stocks"));
        assert_eq!(p.published_at.unwrap().timestamp(), 1_760_000_000);
    }

    #[test]
    fn empty_listing_is_ok_and_garbage_is_an_error() {
        assert!(RedditCrawler::parse_search("{}", "x").unwrap().is_empty());
        assert!(RedditCrawler::parse_search("not json", "x").is_err());
    }
}
