//! Relational store for posts, daily metrics and analytics summaries.
//!
//! rusqlite with the "bundled" feature, so no system SQLite is needed. The
//! Connection sits behind a tokio Mutex so the store can be shared by async
//! sinks; every call holds the lock only for its own statements.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::analyzers::types::{AnalyticsSummary, DailyMetrics};
use crate::error::SinkError;
use crate::model::{Platform, Post};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS posts (
        platform TEXT NOT NULL,
        post_id TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        author_id TEXT NOT NULL,
        author_name TEXT NOT NULL DEFAULT '',
        likes INTEGER NOT NULL DEFAULT 0,
        comments INTEGER NOT NULL DEFAULT 0,
        shares INTEGER NOT NULL DEFAULT 0,
        engagement_score INTEGER NOT NULL DEFAULT 0,
        post_date TEXT NOT NULL,
        views INTEGER,
        url TEXT,
        hashtags TEXT NOT NULL DEFAULT '[]',   -- JSON array
        mentions TEXT NOT NULL DEFAULT '[]',   -- JSON array
        collected_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (platform, post_id)
    );

    CREATE INDEX IF NOT EXISTS idx_posts_date ON posts(post_date);

    CREATE TABLE IF NOT EXISTS daily_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        platform TEXT NOT NULL,
        total_posts INTEGER NOT NULL DEFAULT 0,
        total_likes INTEGER NOT NULL DEFAULT 0,
        total_comments INTEGER NOT NULL DEFAULT 0,
        total_shares INTEGER NOT NULL DEFAULT 0,
        total_engagement INTEGER NOT NULL DEFAULT 0,
        avg_engagement_per_post REAL NOT NULL DEFAULT 0,
        UNIQUE(date, platform)
    );

    CREATE TABLE IF NOT EXISTS analytics_summaries (
        date TEXT PRIMARY KEY,
        summary_data TEXT NOT NULL,            -- JSON AnalyticsSummary
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
";

/// Row counts for the `status` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorageStats {
    pub database: String,
    pub total_posts: u64,
    pub posts_per_platform: BTreeMap<String, u64>,
    pub daily_metrics_rows: u64,
    pub summaries: u64,
    pub latest_post_date: Option<String>,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    /// Opens (or creates) the database file and its tables.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "SQLite store ready");

        Ok(Self {
            conn: Mutex::new(conn),
            location: path.display().to_string(),
        })
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Upserts posts by `(platform, post_id)`. Re-collected posts get their
    /// counters and text refreshed instead of a second row.
    pub async fn save_posts(&self, posts: &[Post]) -> Result<usize, SinkError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO posts (platform, post_id, content, author_id, author_name,
                                    likes, comments, shares, engagement_score, post_date,
                                    views, url, hashtags, mentions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(platform, post_id) DO UPDATE SET
                    content = excluded.content,
                    author_id = excluded.author_id,
                    author_name = excluded.author_name,
                    likes = excluded.likes,
                    comments = excluded.comments,
                    shares = excluded.shares,
                    engagement_score = excluded.engagement_score,
                    post_date = excluded.post_date,
                    views = excluded.views,
                    url = excluded.url,
                    hashtags = excluded.hashtags,
                    mentions = excluded.mentions,
                    collected_at = datetime('now')",
            )?;
            for post in posts {
                stmt.execute(params![
                    post.platform.as_str(),
                    post.post_id,
                    post.content,
                    post.author_id,
                    post.author_name,
                    to_sql_int(post.likes),
                    to_sql_int(post.comments),
                    to_sql_int(post.shares),
                    to_sql_int(post.engagement_score()),
                    post.post_date.to_rfc3339(),
                    post.views.map(to_sql_int),
                    post.url,
                    serde_json::to_string(&post.hashtags)?,
                    serde_json::to_string(&post.mentions)?,
                ])?;
            }
        }
        tx.commit()?;

        debug!(count = posts.len(), "Upserted posts");
        Ok(posts.len())
    }

    /// Replaces metrics rows for the same `(date, platform)`.
    pub async fn save_daily_metrics(&self, metrics: &[DailyMetrics]) -> Result<usize, SinkError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO daily_metrics (date, platform, total_posts, total_likes,
                                            total_comments, total_shares, total_engagement,
                                            avg_engagement_per_post)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(date, platform) DO UPDATE SET
                    total_posts = excluded.total_posts,
                    total_likes = excluded.total_likes,
                    total_comments = excluded.total_comments,
                    total_shares = excluded.total_shares,
                    total_engagement = excluded.total_engagement,
                    avg_engagement_per_post = excluded.avg_engagement_per_post",
            )?;
            for m in metrics {
                stmt.execute(params![
                    m.date.to_string(),
                    m.platform.as_str(),
                    to_sql_int(m.total_posts),
                    to_sql_int(m.total_likes),
                    to_sql_int(m.total_comments),
                    to_sql_int(m.total_shares),
                    to_sql_int(m.total_engagement),
                    m.avg_engagement_per_post,
                ])?;
            }
        }
        tx.commit()?;

        debug!(count = metrics.len(), "Upserted daily metrics");
        Ok(metrics.len())
    }

    /// Stores the summary as JSON, one row per run date.
    pub async fn save_summary(&self, summary: &AnalyticsSummary) -> Result<(), SinkError> {
        let json = serde_json::to_string(summary)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO analytics_summaries (date, summary_data) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET
                summary_data = excluded.summary_data,
                created_at = datetime('now')",
            params![summary.date.to_string(), json],
        )?;
        Ok(())
    }

    pub async fn load_summary(&self, date: chrono::NaiveDate) -> Result<Option<AnalyticsSummary>, SinkError> {
        let conn = self.conn.lock().await;
        let json: Option<String> = conn
            .query_row(
                "SELECT summary_data FROM analytics_summaries WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    /// Most recent posts first, optionally for one platform.
    pub async fn load_posts(&self, platform: Option<Platform>, limit: Option<usize>) -> Result<Vec<Post>, SinkError> {
        let conn = self.conn.lock().await;
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = conn.prepare(
            "SELECT platform, post_id, content, author_id, author_name, likes, comments,
                    shares, post_date, views, url, hashtags, mentions
             FROM posts
             WHERE ?1 IS NULL OR platform = ?1
             ORDER BY post_date DESC, platform, post_id
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![platform.map(|p| p.as_str()), limit], post_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn storage_stats(&self) -> Result<StorageStats, SinkError> {
        let conn = self.conn.lock().await;

        let count = |sql: &str| -> Result<u64, rusqlite::Error> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(from_sql_int)
        };

        let mut per_platform = BTreeMap::new();
        let mut stmt = conn.prepare("SELECT platform, COUNT(*) FROM posts GROUP BY platform")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (platform, n) = row?;
            per_platform.insert(platform, from_sql_int(n));
        }

        Ok(StorageStats {
            database: self.location.clone(),
            total_posts: count("SELECT COUNT(*) FROM posts")?,
            posts_per_platform: per_platform,
            daily_metrics_rows: count("SELECT COUNT(*) FROM daily_metrics")?,
            summaries: count("SELECT COUNT(*) FROM analytics_summaries")?,
            latest_post_date: conn.query_row("SELECT MAX(post_date) FROM posts", [], |row| row.get(0))?,
        })
    }
}

/// SQLite integers are signed; counters beyond `i64::MAX` are clamped.
fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    let platform: String = row.get(0)?;
    let post_date: String = row.get(8)?;
    let hashtags: String = row.get(11)?;
    let mentions: String = row.get(12)?;

    Ok(Post {
        platform: platform.parse().map_err(|e| conversion_error(0, e))?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        likes: from_sql_int(row.get(5)?),
        comments: from_sql_int(row.get(6)?),
        shares: from_sql_int(row.get(7)?),
        post_date: DateTime::parse_from_rfc3339(&post_date)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| conversion_error(8, e))?,
        views: row.get::<_, Option<i64>>(9)?.map(from_sql_int),
        url: row.get(10)?,
        hashtags: serde_json::from_str(&hashtags).map_err(|e| conversion_error(11, e))?,
        mentions: serde_json::from_str(&mentions).map_err(|e| conversion_error(12, e))?,
    })
}
