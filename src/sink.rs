//! Storage collaborators that accept a finished run.
//!
//! Every sink receives the same [`RunOutput`] and returns the locations it
//! wrote. A failing sink does not stop the others; the pipeline records the
//! error and marks the run unsuccessful.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use crate::analyzers::AnalyticsSummary;
use crate::error::SinkError;
use crate::infra::s3::S3Uploader;
use crate::infra::sqlite::SqliteStore;
use crate::model::Post;
use crate::output::{self, PostRow};

/// Normalized posts plus the summary built from them.
#[derive(Debug, Clone, Copy)]
pub struct RunOutput<'a> {
    pub run_date: NaiveDate,
    pub posts: &'a [Post],
    pub summary: &'a AnalyticsSummary,
}

#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Persists the run and returns the written locations.
    async fn write(&self, output: &RunOutput<'_>) -> Result<Vec<String>, SinkError>;
}

/// Local sink selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputFormat {
    Json,
    Csv,
    Database,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "database" | "db" | "sqlite" => Ok(OutputFormat::Database),
            other => Err(format!(
                "unknown output format `{other}` (expected json, csv or database)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Database => "database",
        })
    }
}

fn dated(dir: &Path, stem: &str, date: NaiveDate, ext: &str) -> PathBuf {
    dir.join(format!("{stem}_{date}.{ext}"))
}

fn location(path: &Path) -> String {
    path.display().to_string()
}

/// `posts_{date}.json` and `analytics_summary_{date}.json`.
pub struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Sink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn write(&self, output: &RunOutput<'_>) -> Result<Vec<String>, SinkError> {
        let posts = dated(&self.dir, "posts", output.run_date, "json");
        output::write_posts_json(&posts, output.posts)?;

        let summary = dated(&self.dir, "analytics_summary", output.run_date, "json");
        output::write_json(&summary, output.summary)?;

        Ok(vec![location(&posts), location(&summary)])
    }
}

/// Flattened posts, daily metrics, top posts and moving averages.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn write(&self, output: &RunOutput<'_>) -> Result<Vec<String>, SinkError> {
        let date = output.run_date;
        let summary = output.summary;

        let posts = dated(&self.dir, "posts", date, "csv");
        output::write_csv(&posts, output.posts.iter().map(PostRow::from))?;

        let metrics = dated(&self.dir, "daily_metrics", date, "csv");
        output::write_csv(&metrics, &summary.daily_metrics)?;

        let top = dated(&self.dir, "top_posts", date, "csv");
        output::write_csv(&top, output::top_post_rows(summary))?;

        let averages = dated(&self.dir, "moving_averages", date, "csv");
        output::write_csv(&averages, &summary.moving_averages)?;

        Ok([posts, metrics, top, averages].iter().map(|p| location(p)).collect())
    }
}

/// One row per post and per daily metric, plus the summary as JSON.
pub struct DatabaseSink {
    store: Arc<SqliteStore>,
}

impl DatabaseSink {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Sink for DatabaseSink {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn write(&self, output: &RunOutput<'_>) -> Result<Vec<String>, SinkError> {
        let posts = self.store.save_posts(output.posts).await?;
        let metrics = self
            .store
            .save_daily_metrics(&output.summary.daily_metrics)
            .await?;
        self.store.save_summary(output.summary).await?;

        info!(posts, metrics, database = %self.store.location(), "Saved run to database");
        Ok(vec![format!(
            "{} ({posts} posts, {metrics} daily metrics)",
            self.store.location()
        )])
    }
}

/// Summary JSON and posts CSV under `{date}/` in the bucket.
pub struct S3Sink {
    uploader: S3Uploader,
}

impl S3Sink {
    pub fn new(uploader: S3Uploader) -> Self {
        Self { uploader }
    }
}

#[async_trait]
impl Sink for S3Sink {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn write(&self, output: &RunOutput<'_>) -> Result<Vec<String>, SinkError> {
        let date = output.run_date;

        let summary = self
            .uploader
            .put_json(&format!("{date}/analytics_summary_{date}.json"), output.summary)
            .await?;

        let csv = output::csv_bytes(output.posts.iter().map(PostRow::from))?;
        let posts = self
            .uploader
            .put(&format!("{date}/posts_{date}.csv"), csv, "text/csv")
            .await?;

        Ok(vec![summary, posts])
    }
}

/// Builds the local sinks for `formats`, in a fixed order, without repeats.
pub fn local_sinks(
    formats: &[OutputFormat],
    output_dir: &Path,
    database_path: &Path,
) -> Result<Vec<Box<dyn Sink>>, SinkError> {
    let mut formats = formats.to_vec();
    formats.sort();
    formats.dedup();

    let mut sinks: Vec<Box<dyn Sink>> = Vec::with_capacity(formats.len());
    for format in formats {
        match format {
            OutputFormat::Json => sinks.push(Box::new(JsonSink::new(output_dir))),
            OutputFormat::Csv => sinks.push(Box::new(CsvSink::new(output_dir))),
            OutputFormat::Database => {
                let store = SqliteStore::open(database_path)?;
                sinks.push(Box::new(DatabaseSink::new(Arc::new(store))));
            }
        }
    }
    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::build_summary;
    use crate::config::AnalyticsConfig;
    use crate::model::Platform;
    use crate::model::fixtures::post;
    use std::env;
    use std::fs;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn fixture() -> (Vec<Post>, AnalyticsSummary) {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 3, 1), 10, 5, 2),
            post("v1", Platform::Youtube, (2024, 2, 29), 40, 3, 0),
        ];
        let summary = build_summary(run_date(), &posts, &AnalyticsConfig::default()).unwrap();
        (posts, summary)
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("sqlite".parse::<OutputFormat>(), Ok(OutputFormat::Database));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[tokio::test]
    async fn test_json_and_csv_sinks_write_dated_files() {
        let dir = env::temp_dir().join("social_analytics_test_sinks");
        let (posts, summary) = fixture();
        let output = RunOutput {
            run_date: run_date(),
            posts: &posts,
            summary: &summary,
        };

        let json = JsonSink::new(&dir).write(&output).await.unwrap();
        let csv = CsvSink::new(&dir).write(&output).await.unwrap();

        assert_eq!(json.len(), 2);
        assert_eq!(csv.len(), 4);
        assert!(json[1].ends_with("analytics_summary_2024-03-01.json"));

        let metrics = fs::read_to_string(dir.join("daily_metrics_2024-03-01.csv")).unwrap();
        assert!(metrics.starts_with("date,platform,total_posts"));
        assert_eq!(metrics.lines().count(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_database_sink_counts_rows() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let (posts, summary) = fixture();
        let output = RunOutput {
            run_date: run_date(),
            posts: &posts,
            summary: &summary,
        };

        let saved = DatabaseSink::new(Arc::clone(&store))
            .write(&output)
            .await
            .unwrap();
        assert_eq!(saved, vec![":memory: (2 posts, 2 daily metrics)".to_string()]);

        let stats = store.storage_stats().await.unwrap();
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.summaries, 1);
    }

    #[test]
    fn test_local_sinks_dedup_and_order() {
        let dir = env::temp_dir().join("social_analytics_test_local_sinks");
        let sinks = local_sinks(
            &[OutputFormat::Csv, OutputFormat::Json, OutputFormat::Csv],
            &dir,
            &dir.join("unused.db"),
        )
        .unwrap();
        let names: Vec<_> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["json", "csv"]);
    }
}
