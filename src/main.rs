//! CLI entry point for the social media analytics pipeline.
//!
//! Collects posts from the configured platforms (or from saved raw payload
//! files), builds the daily analytics summary and hands it to the selected
//! sinks. The run report is printed to stdout as JSON; logs go to stderr
//! and to a JSON rolling log file.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use social_analytics::config::{Credentials, PipelineConfig};
use social_analytics::infra::s3::S3Uploader;
use social_analytics::infra::sqlite::SqliteStore;
use social_analytics::model::Platform;
use social_analytics::output::load_posts_json;
use social_analytics::pipeline::{analyze_posts, deliver, run_once};
use social_analytics::sink::{OutputFormat, RunOutput, S3Sink, Sink, local_sinks};
use social_analytics::sources::{self, FetchQuery, FileSource, PostSource};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "social_analytics")]
#[command(about = "Collect social media posts and compute engagement analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Local outputs to write, comma separated (json, csv, database)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values_t = [OutputFormat::Json, OutputFormat::Csv, OutputFormat::Database]
    )]
    format: Vec<OutputFormat>,

    /// Directory for JSON and CSV files [default: OUTPUT_DIR]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Optional: S3 bucket to upload the summary and posts CSV to
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Key prefix inside the S3 bucket
    #[arg(long, default_value = "")]
    s3_prefix: String,

    /// Optional: Gzip compress files before uploading to S3
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect posts from every configured platform and run the analytics
    Run {
        /// First day to collect (UTC) [default: END minus LOOKBACK_DAYS]
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day to collect (UTC); also the run date [default: today]
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Search query; repeat for several
        #[arg(short, long = "query")]
        queries: Vec<String>,

        /// Account to collect from, as PLATFORM=ID; repeat per platform
        #[arg(short, long = "user", value_parser = parse_user)]
        users: Vec<(Platform, String)>,

        /// Maximum posts per platform [default: POSTS_LIMIT]
        #[arg(short, long)]
        limit: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the analytics over raw payload files instead of live APIs
    Analyze {
        /// Raw payload file as PLATFORM=FILE; repeat per file
        #[arg(short, long = "source", value_parser = parse_source, required = true)]
        sources: Vec<(Platform, PathBuf)>,

        /// Run date [default: today]
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rebuild the summary from a saved posts JSON file
    Report {
        /// posts_{date}.json written by the json output
        #[arg(long, value_name = "FILE")]
        posts: PathBuf,

        /// Run date [default: today]
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show configured platforms, effective settings and storage stats
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/social_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("social_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env()?;

    match cli.command {
        Commands::Run {
            start,
            end,
            queries,
            users,
            limit,
            output,
        } => {
            let run_date = end.unwrap_or_else(|| Utc::now().date_naive());
            let start = match start {
                Some(start) => start,
                None => run_date
                    .checked_sub_days(Days::new(u64::from(config.lookback_days)))
                    .context("LOOKBACK_DAYS reaches before the earliest supported date")?,
            };
            let query = FetchQuery {
                queries,
                user_ids: users.into_iter().collect(),
                since: Some(start_of_day(start)),
                until: end.map(end_of_window),
                limit: limit.unwrap_or(config.posts_limit),
            };

            let credentials = Credentials::from_env();
            let sources = sources::from_credentials(
                &credentials,
                config.fetch_timeout,
                config.batch_size,
            )?;
            if sources.is_empty() {
                warn!("No platform credentials configured, nothing will be collected");
            }

            let sinks = build_sinks(&output, &config).await?;
            collect_and_report(&config, &sources, &query, run_date, &sinks).await?;
        }
        Commands::Analyze {
            sources,
            date,
            output,
        } => {
            let run_date = date.unwrap_or_else(|| Utc::now().date_naive());
            let sources: Vec<Arc<dyn PostSource>> = sources
                .into_iter()
                .map(|(platform, path)| Arc::new(FileSource::new(platform, path)) as Arc<dyn PostSource>)
                .collect();

            let sinks = build_sinks(&output, &config).await?;
            collect_and_report(&config, &sources, &FetchQuery::default(), run_date, &sinks).await?;
        }
        Commands::Report {
            posts,
            date,
            output,
        } => {
            let run_date = date.unwrap_or_else(|| Utc::now().date_naive());
            let sinks = build_sinks(&output, &config).await?;
            report(&config, &posts, run_date, &sinks).await?;
        }
        Commands::Status => status(&config).await?,
    }

    Ok(())
}

/// Filter from `var`, or `default` when unset or unparsable.
fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn parse_user(raw: &str) -> Result<(Platform, String), String> {
    let (platform, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PLATFORM=ID, got `{raw}`"))?;
    let platform = platform.parse::<Platform>().map_err(|e| e.to_string())?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("empty id for {platform}"));
    }
    Ok((platform, id.to_string()))
}

fn parse_source(raw: &str) -> Result<(Platform, PathBuf), String> {
    let (platform, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PLATFORM=FILE, got `{raw}`"))?;
    let platform = platform.parse::<Platform>().map_err(|e| e.to_string())?;
    Ok((platform, PathBuf::from(path)))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// End of `date`, capped shortly before now since APIs reject future bounds.
fn end_of_window(date: NaiveDate) -> DateTime<Utc> {
    let end = date
        .succ_opt()
        .map(start_of_day)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    end.min(Utc::now() - chrono::Duration::seconds(30))
}

async fn build_sinks(args: &OutputArgs, config: &PipelineConfig) -> Result<Vec<Box<dyn Sink>>> {
    let output_dir = args.output_dir.as_deref().unwrap_or(config.output_dir.as_path());
    let mut sinks = local_sinks(&args.format, output_dir, &config.database_path)?;

    if let Some(bucket) = &args.s3_bucket {
        info!(bucket = %bucket, gzip = args.gzip, "S3 upload enabled");
        let uploader = S3Uploader::from_env(bucket.as_str())
            .await
            .prefix(&args.s3_prefix)
            .gzip(args.gzip);
        sinks.push(Box::new(S3Sink::new(uploader)));
    }

    Ok(sinks)
}

/// Runs the pipeline and prints the report. Only aggregation errors fail.
#[tracing::instrument(skip_all, fields(run_date = %run_date, sources = sources.len()))]
async fn collect_and_report(
    config: &PipelineConfig,
    sources: &[Arc<dyn PostSource>],
    query: &FetchQuery,
    run_date: NaiveDate,
    sinks: &[Box<dyn Sink>],
) -> Result<()> {
    let report = run_once(config, sources, query, run_date, sinks).await?;
    if !report.success {
        warn!(errors = ?report.errors, "Run completed with sink failures");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tracing::instrument(skip_all, fields(posts = %posts.display(), run_date = %run_date))]
async fn report(
    config: &PipelineConfig,
    posts: &Path,
    run_date: NaiveDate,
    sinks: &[Box<dyn Sink>],
) -> Result<()> {
    let loaded = load_posts_json(posts)
        .with_context(|| format!("failed to load posts from {}", posts.display()))?;
    info!(count = loaded.len(), "Loaded saved posts");

    let analysis = analyze_posts(&config.analytics, loaded, run_date)?;
    let output = RunOutput {
        run_date,
        posts: &analysis.posts,
        summary: &analysis.summary,
    };
    let (saved, errors) = deliver(sinks, &output).await;
    for error in &errors {
        warn!(error = %error, "Output not saved");
    }
    info!(saved = saved.len(), "Report rebuilt");

    println!("{}", serde_json::to_string_pretty(&analysis.summary)?);
    Ok(())
}

async fn status(config: &PipelineConfig) -> Result<()> {
    let credentials = Credentials::from_env();
    let storage = if config.database_path.exists() {
        let store = SqliteStore::open(&config.database_path)?;
        Some(store.storage_stats().await?)
    } else {
        info!(path = %config.database_path.display(), "No database yet");
        None
    };

    let status = json!({
        "configured_platforms": credentials.configured_platforms(),
        "config": {
            "batch_size": config.batch_size,
            "max_retries": config.max_retries,
            "retry_delay_secs": config.retry_delay.as_secs(),
            "fetch_timeout_secs": config.fetch_timeout.as_secs(),
            "posts_limit": config.posts_limit,
            "lookback_days": config.lookback_days,
            "output_dir": config.output_dir,
            "database_path": config.database_path,
            "top_posts_overall": config.analytics.top_overall,
            "top_posts_per_platform": config.analytics.top_per_platform,
            "moving_average_windows": config.analytics.moving_average_windows,
            "anomaly_threshold": config.analytics.anomaly_threshold,
        },
        "storage": storage,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
