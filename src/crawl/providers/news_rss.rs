// src/crawl/providers/news_rss.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::parse_rfc2822;
use crate::config::AppConfig;
use crate::crawl::normalize_text;
use crate::crawl::types::Crawler;
use crate::store::NewPost;

const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";
const MARKETWATCH_REALTIME: &str =
    "https://feeds.content.dowjones.io/public/rss/mw_realtimeheadlines";
const FEED_ITEM_CAP: usize = 20;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    guid: Option<TextNode>,
    source: Option<TextNode>,
}

/// Element whose attributes we ignore, e.g. `<source url="..">Reuters</source>`.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text")]
    text: Option<String>,
}

impl TextNode {
    fn non_empty(node: Option<TextNode>) -> Option<String> {
        node.and_then(|n| n.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// One RSS endpoint and how its items become posts.
#[derive(Debug, Clone)]
pub struct NewsFeed {
    /// External id prefix, e.g. `gnews`.
    pub prefix: &'static str,
    /// Author used when an item carries no `<source>`.
    pub outlet: &'static str,
    pub url: String,
    /// Only the first N items are kept.
    pub max_items: Option<usize>,
    /// Lowercase keywords; when non-empty an item must mention one of them.
    pub keywords: Vec<String>,
}

impl NewsFeed {
    pub fn google_news(term: &str) -> Result<Self> {
        let url = reqwest::Url::parse_with_params(
            GOOGLE_NEWS_SEARCH,
            &[("q", term), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
        )
        .context("building google news url")?;
        Ok(Self {
            prefix: "gnews",
            outlet: "Google News",
            url: url.to_string(),
            max_items: Some(FEED_ITEM_CAP),
            keywords: Vec::new(),
        })
    }

    pub fn yahoo_finance(ticker: &str) -> Self {
        Self {
            prefix: "yahoo",
            outlet: "Yahoo Finance",
            url: format!(
                "https://feeds.finance.yahoo.com/rss/2.0/headline?s={ticker}&region=US&lang=en-US"
            ),
            max_items: Some(FEED_ITEM_CAP),
            keywords: Vec::new(),
        }
    }

    pub fn marketwatch(keywords: &[String]) -> Self {
        Self {
            prefix: "mw",
            outlet: "MarketWatch",
            url: MARKETWATCH_REALTIME.to_string(),
            max_items: None,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn wants(&self, title: &str, description: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = format!("{title} {description}").to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Feeds polled for the configured ticker: Google News per search term, then Yahoo, then MarketWatch.
pub fn feeds_for(cfg: &AppConfig) -> Result<Vec<NewsFeed>> {
    let mut feeds = Vec::with_capacity(cfg.search_terms.len() + 2);
    for term in &cfg.search_terms {
        feeds.push(NewsFeed::google_news(term)?);
    }
    feeds.push(NewsFeed::yahoo_finance(&cfg.ticker));
    feeds.push(NewsFeed::marketwatch(&cfg.news_keywords));
    Ok(feeds)
}

pub struct NewsRssCrawler {
    mode: Mode,
}

enum Mode {
    Fixture(Vec<(NewsFeed, String)>),
    Http {
        client: reqwest::Client,
        feeds: Vec<NewsFeed>,
        pause: Duration,
    },
}

impl NewsRssCrawler {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("building news http client")?;
        Ok(Self {
            mode: Mode::Http {
                client,
                feeds: feeds_for(cfg)?,
                pause: Duration::from_millis(cfg.request_pause_ms),
            },
        })
    }

    pub fn from_fixture(feed: NewsFeed, xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(vec![(feed, xml.to_string())]),
        }
    }

    pub fn from_fixtures(pages: Vec<(NewsFeed, String)>) -> Self {
        Self {
            mode: Mode::Fixture(pages),
        }
    }

    /// Parse one RSS document into `news` posts.
    pub fn parse_feed(feed: &NewsFeed, xml: &str) -> Result<Vec<NewPost>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", feed.prefix))?;

        let cap = feed.max_items.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(cap) {
            let title = it.title.unwrap_or_default();
            let description = it.description.unwrap_or_default();
            if !feed.wants(&title, &description) {
                continue;
            }

            let link = it.link.unwrap_or_default();
            let id_seed = TextNode::non_empty(it.guid).unwrap_or_else(|| link.clone());
            if id_seed.is_empty() {
                continue;
            }

            out.push(NewPost {
                source: "news".to_string(),
                external_id: format!("{}_{}", feed.prefix, sha256_hex(&id_seed)),
                title: normalize_text(&title),
                content: normalize_text(&description),
                author: Some(
                    TextNode::non_empty(it.source).unwrap_or_else(|| feed.outlet.to_string()),
                ),
                url: Some(link).filter(|l| !l.is_empty()),
                subreddit: None,
                engagement: None,
                num_comments: None,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
            });
        }

        histogram!("crawl_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl Crawler for NewsRssCrawler {
    async fn crawl(&self) -> Result<Vec<NewPost>> {
        match &self.mode {
            Mode::Fixture(pages) => {
                let mut out = Vec::new();
                for (feed, xml) in pages {
                    out.extend(Self::parse_feed(feed, xml)?);
                }
                Ok(out)
            }

            Mode::Http {
                client,
                feeds,
                pause,
            } => {
                let mut out = Vec::new();
                let mut failures = 0usize;
                for feed in feeds {
                    let fetched: Result<Vec<NewPost>> = async {
                        let body = client
                            .get(&feed.url)
                            .send()
                            .await
                            .with_context(|| format!("{} http get()", feed.prefix))?
                            .error_for_status()
                            .with_context(|| format!("{} http status", feed.prefix))?
                            .text()
                            .await
                            .with_context(|| format!("{} http .text()", feed.prefix))?;
                        Self::parse_feed(feed, &body)
                    }
                    .await;

                    match fetched {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(error = ?e, feed = feed.prefix, "news feed failed");
                        }
                    }
                    tokio::time::sleep(*pause).await;
                }
                if !feeds.is_empty() && failures == feeds.len() {
                    bail!("all {} news feeds failed", feeds.len());
                }
                tracing::info!(target: "crawl", articles = out.len(), "news fetched");
                Ok(out)
            }
        }
    }

    fn name(&self) -> &'static str {
        "news"
    }
}

fn sha256_hex(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// quick-xml only knows the XML entities
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
