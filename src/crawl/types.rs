// src/crawl/types.rs
use anyhow::Result;

use crate::store::NewPost;

#[async_trait::async_trait]
pub trait Crawler: Send + Sync {
    async fn crawl(&self) -> Result<Vec<NewPost>>;
    fn name(&self) -> &'static str;
}

/// Outcome of one pass over all crawlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CrawlReport {
    pub fetched: usize,
    pub inserted: usize,
    /// Names of crawlers that failed this run (contributed zero posts).
    pub failed: Vec<&'static str>,
}
