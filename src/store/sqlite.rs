//! SQLite-backed post store (`sqlx`, runtime queries).

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{
    format_date, format_timestamp, parse_timestamp, NewPost, PostStore, ScoredObservation,
    StoredPost, UnscoredPost,
};

const CREATE_POSTS: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    external_id TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    author TEXT,
    url TEXT,
    subreddit TEXT,
    engagement INTEGER,
    num_comments INTEGER,
    sentiment REAL,
    published_at TEXT,
    crawled_at TEXT NOT NULL,
    UNIQUE(source, external_id)
)
"#;

const CREATE_PUBLISHED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_posts_published_at ON posts(published_at)";

#[derive(Debug, Clone)]
pub struct SqlitePostStore {
    pool: SqlitePool,
}

impl SqlitePostStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub async fn open(path: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))
            .with_context(|| format!("parsing sqlite path {path}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .with_context(|| format!("opening sqlite database {path}"))?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database. One connection, otherwise each pooled
    /// connection would see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("opening in-memory sqlite")?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_POSTS)
            .execute(&pool)
            .await
            .context("creating posts table")?;
        sqlx::query(CREATE_PUBLISHED_INDEX)
            .execute(&pool)
            .await
            .context("creating posts index")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn insert_posts(&self, posts: &[NewPost]) -> Result<usize> {
        let crawled_at = format_timestamp(&Utc::now());
        let mut tx = self.pool.begin().await.context("begin insert tx")?;
        let mut inserted = 0usize;
        for p in posts {
            let res = sqlx::query(
                r#"INSERT OR IGNORE INTO posts
                   (source, external_id, title, content, author, url, subreddit,
                    engagement, num_comments, published_at, crawled_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&p.source)
            .bind(&p.external_id)
            .bind(&p.title)
            .bind(&p.content)
            .bind(&p.author)
            .bind(&p.url)
            .bind(&p.subreddit)
            .bind(p.engagement)
            .bind(p.num_comments)
            .bind(p.published_at.as_ref().map(format_timestamp))
            .bind(&crawled_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting {}/{}", p.source, p.external_id))?;
            if res.rows_affected() > 0 {
                inserted += 1;
            }
        }
        tx.commit().await.context("commit insert tx")?;
        Ok(inserted)
    }

    async fn unscored_posts(&self) -> Result<Vec<UnscoredPost>> {
        let rows = sqlx::query("SELECT id, title, content FROM posts WHERE sentiment IS NULL")
            .fetch_all(&self.pool)
            .await
            .context("selecting unscored posts")?;
        rows.iter()
            .map(|r| -> Result<UnscoredPost> {
                Ok(UnscoredPost {
                    id: r.try_get("id")?,
                    title: r.try_get("title")?,
                    content: r.try_get("content")?,
                })
            })
            .collect()
    }

    async fn write_sentiment(&self, id: i64, score: f64) -> Result<()> {
        sqlx::query("UPDATE posts SET sentiment = ? WHERE id = ?")
            .bind(score)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating sentiment for post {id}"))?;
        Ok(())
    }

    async fn write_sentiments(&self, scores: &[(i64, f64)]) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("begin sentiment tx")?;
        let mut written = 0usize;
        for &(id, score) in scores {
            let res = sqlx::query("UPDATE posts SET sentiment = ? WHERE id = ?")
                .bind(score)
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("updating sentiment for post {id}"))?;
            written += res.rows_affected() as usize;
        }
        tx.commit().await.context("commit sentiment tx")?;
        Ok(written)
    }

    async fn scored_since(&self, cutoff: NaiveDate) -> Result<Vec<ScoredObservation>> {
        let rows = sqlx::query(
            r#"SELECT date(published_at) AS day, source, sentiment, engagement
               FROM posts
               WHERE sentiment IS NOT NULL
                 AND published_at >= ?
                 AND date(published_at) IS NOT NULL
               ORDER BY day"#,
        )
        .bind(format_date(&cutoff))
        .fetch_all(&self.pool)
        .await
        .context("selecting scored posts")?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let day: String = r.try_get("day")?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .with_context(|| format!("sqlite returned malformed day {day}"))?;
            out.push(ScoredObservation {
                date,
                source: r.try_get("source")?,
                sentiment: r.try_get("sentiment")?,
                weight: r.try_get("engagement")?,
            });
        }
        Ok(out)
    }

    async fn post_counts(&self) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query("SELECT source, COUNT(*) AS cnt FROM posts GROUP BY source")
            .fetch_all(&self.pool)
            .await
            .context("counting posts")?;
        let mut counts = BTreeMap::new();
        for r in rows {
            counts.insert(r.try_get("source")?, r.try_get("cnt")?);
        }
        Ok(counts)
    }

    async fn recent_posts(&self, source: Option<&str>, limit: usize) -> Result<Vec<StoredPost>> {
        let mut sql = String::from(
            "SELECT id, source, external_id, title, author, url, engagement, sentiment, published_at FROM posts",
        );
        if source.is_some() {
            sql.push_str(" WHERE source = ?");
        }
        sql.push_str(" ORDER BY published_at DESC LIMIT ?");

        let mut q = sqlx::query(&sql);
        if let Some(s) = source {
            q = q.bind(s);
        }
        let rows = q
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .context("selecting recent posts")?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let published: Option<String> = r.try_get("published_at")?;
            out.push(StoredPost {
                id: r.try_get("id")?,
                source: r.try_get("source")?,
                external_id: r.try_get("external_id")?,
                title: r.try_get("title")?,
                author: r.try_get("author")?,
                url: r.try_get("url")?,
                engagement: r.try_get("engagement")?,
                sentiment: r.try_get("sentiment")?,
                published_at: published.as_deref().and_then(parse_timestamp),
            });
        }
        Ok(out)
    }
}
