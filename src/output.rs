//! File formats for run output: JSON documents and flattened CSV tables.
//!
//! CSV rows are flat views over the domain types; list fields are joined
//! with commas so each post stays one row.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::types::{AnalyticsSummary, TopPost};
use crate::error::SinkError;
use crate::model::{Post, ScoredPost};

/// Writes `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<(), SinkError> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Posts with their derived engagement score, as written by the JSON sink.
pub fn write_posts_json(path: &Path, posts: &[Post]) -> Result<(), SinkError> {
    let scored: Vec<ScoredPost<'_>> = posts.iter().map(ScoredPost::from).collect();
    write_json(path, &scored)
}

/// Reads posts previously written by [`write_posts_json`].
pub fn load_posts_json(path: &Path) -> Result<Vec<Post>, SinkError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Serializes `rows` as CSV. The header comes from the first row, so an
/// empty table is an empty file.
pub fn csv_bytes<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>, SinkError> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| SinkError::Io(e.into_error()))
}

/// Writes `rows` as a CSV table, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), SinkError> {
    ensure_parent(path)?;
    let bytes = csv_bytes(rows)?;
    fs::write(path, bytes)?;
    debug!(path = %path.display(), "Wrote CSV");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// One CSV row per post.
#[derive(Debug, Serialize)]
pub struct PostRow<'a> {
    pub post_id: &'a str,
    pub platform: &'static str,
    pub content: &'a str,
    pub author_id: &'a str,
    pub author_name: &'a str,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub engagement_score: u64,
    pub post_date: String,
    pub views: Option<u64>,
    pub url: &'a str,
    pub hashtags: String,
    pub mentions: String,
}

impl<'a> From<&'a Post> for PostRow<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            post_id: &post.post_id,
            platform: post.platform.as_str(),
            content: &post.content,
            author_id: &post.author_id,
            author_name: &post.author_name,
            likes: post.likes,
            comments: post.comments,
            shares: post.shares,
            engagement_score: post.engagement_score(),
            post_date: post.post_date.to_rfc3339(),
            views: post.views,
            url: post.url.as_deref().unwrap_or_default(),
            hashtags: post.hashtags.join(","),
            mentions: post.mentions.join(","),
        }
    }
}

/// Top-post entry tagged with the ranking it belongs to: `overall` or a
/// platform name.
#[derive(Debug, Serialize)]
pub struct TopPostRow<'a> {
    pub scope: &'a str,
    pub rank: usize,
    pub post_id: &'a str,
    pub platform: &'static str,
    pub engagement_score: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub post_date: String,
    pub author_name: &'a str,
    pub content: &'a str,
}

impl<'a> TopPostRow<'a> {
    fn new(scope: &'a str, top: &'a TopPost) -> Self {
        Self {
            scope,
            rank: top.rank,
            post_id: &top.post_id,
            platform: top.platform.as_str(),
            engagement_score: top.engagement_score,
            likes: top.likes,
            comments: top.comments,
            shares: top.shares,
            post_date: top.post_date.to_rfc3339(),
            author_name: &top.author_name,
            content: &top.content,
        }
    }
}

/// Overall ranking first, then each platform's ranking in platform order.
pub fn top_post_rows(summary: &AnalyticsSummary) -> Vec<TopPostRow<'_>> {
    let overall = summary
        .top_posts_overall
        .iter()
        .map(|top| TopPostRow::new("overall", top));
    let per_platform = summary
        .top_posts_per_platform
        .iter()
        .flat_map(|(platform, tops)| {
            tops.iter()
                .map(move |top| TopPostRow::new(platform.as_str(), top))
        });
    overall.chain(per_platform).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::build_summary;
    use crate::config::AnalyticsConfig;
    use crate::model::Platform;
    use crate::model::fixtures::post;
    use chrono::NaiveDate;
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn posts() -> Vec<Post> {
        let mut first = post("1", Platform::Twitter, (2024, 1, 1), 10, 5, 2);
        first.hashtags = vec!["rust".into(), "data".into()];
        vec![first, post("2", Platform::Youtube, (2024, 1, 1), 1, 0, 0)]
    }

    #[test]
    fn test_posts_json_roundtrip_includes_score() {
        let path = temp_path("social_analytics_test_posts.json");
        let posts = posts();

        write_posts_json(&path, &posts).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"engagement_score\": 17"));
        assert_eq!(load_posts_json(&path).unwrap(), posts);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_post_rows_flatten_lists() {
        let posts = posts();
        let bytes = csv_bytes(posts.iter().map(PostRow::from)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("post_id,platform,content"));
        assert!(lines[1].contains("\"rust,data\""));
    }

    #[test]
    fn test_write_csv_replaces_file() {
        let path = temp_path("social_analytics_test_replace.csv");
        let posts = posts();

        write_csv(&path, posts.iter().map(PostRow::from)).unwrap();
        write_csv(&path, posts.iter().take(1).map(PostRow::from)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("post_id")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_top_post_rows_scopes() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = build_summary(date, &posts(), &AnalyticsConfig::default()).unwrap();
        let rows = top_post_rows(&summary);

        let scopes: Vec<_> = rows.iter().map(|r| (r.scope, r.post_id)).collect();
        assert_eq!(
            scopes,
            vec![
                ("overall", "1"),
                ("overall", "2"),
                ("twitter", "1"),
                ("youtube", "2"),
            ]
        );
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(load_posts_json(&temp_path("social_analytics_test_nope.json")).is_err());
    }
}
