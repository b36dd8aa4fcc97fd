//! One collection + analytics run.
//!
//! `run_once` is the invocation contract used by the CLI: collect from every
//! source, normalize, de-duplicate, aggregate, then hand the result to each
//! sink. Only an [`AggregationError`] aborts it; everything else is reported
//! in the [`RunReport`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::analyzers::{AnalyticsSummary, build_summary};
use crate::collect::collect_all;
use crate::config::{AnalyticsConfig, PipelineConfig};
use crate::error::AggregationError;
use crate::model::{Platform, Post};
use crate::normalize::normalize_batch;
use crate::retry::RetryPolicy;
use crate::sink::{RunOutput, Sink};
use crate::sources::{FetchQuery, PostSource};

/// Per-platform counts for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub fetched: usize,
    pub normalized: usize,
    pub rejected: usize,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Structured result handed back to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// False only when a sink failed to store the run.
    pub success: bool,
    pub run_date: NaiveDate,
    pub posts_collected: usize,
    pub posts_rejected: usize,
    pub duplicates_merged: usize,
    pub platforms: Vec<PlatformOutcome>,
    pub errors: Vec<String>,
    pub saved_outputs: Vec<String>,
    pub summary: AnalyticsSummary,
}

/// De-duplicated posts and the summary built from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub posts: Vec<Post>,
    pub duplicates_merged: usize,
    pub summary: AnalyticsSummary,
}

/// Collapses posts sharing `(platform, post_id)`.
///
/// The copy with the highest engagement score is kept in the slot of the
/// first occurrence; ties keep the first seen. Returns the merge count.
pub fn dedupe_posts(posts: Vec<Post>) -> (Vec<Post>, usize) {
    let mut slots: HashMap<(Platform, String), usize> = HashMap::with_capacity(posts.len());
    let mut kept: Vec<Post> = Vec::with_capacity(posts.len());
    let mut merged = 0;

    for post in posts {
        match slots.get(&(post.platform, post.post_id.clone())) {
            Some(&slot) => {
                merged += 1;
                if post.engagement_score() > kept[slot].engagement_score() {
                    kept[slot] = post;
                }
            }
            None => {
                slots.insert((post.platform, post.post_id.clone()), kept.len());
                kept.push(post);
            }
        }
    }

    (kept, merged)
}

/// Pure core of a run: de-duplicate, then summarize for `run_date`.
pub fn analyze_posts(
    config: &AnalyticsConfig,
    posts: Vec<Post>,
    run_date: NaiveDate,
) -> Result<Analysis, AggregationError> {
    let (posts, duplicates_merged) = dedupe_posts(posts);
    if duplicates_merged > 0 {
        info!(duplicates_merged, "Merged duplicate posts");
    }
    let summary = build_summary(run_date, &posts, config)?;
    Ok(Analysis {
        posts,
        duplicates_merged,
        summary,
    })
}

/// Runs every sink, collecting written locations and error messages.
pub async fn deliver(sinks: &[Box<dyn Sink>], output: &RunOutput<'_>) -> (Vec<String>, Vec<String>) {
    let mut saved = Vec::new();
    let mut errors = Vec::new();

    for sink in sinks {
        match sink.write(output).await {
            Ok(locations) => {
                info!(sink = sink.name(), outputs = locations.len(), "Sink completed");
                saved.extend(locations);
            }
            Err(e) => {
                error!(sink = sink.name(), error = %e, "Sink failed");
                errors.push(format!("{} sink: {e}", sink.name()));
            }
        }
    }

    (saved, errors)
}

#[tracing::instrument(skip_all, fields(run_date = %run_date, sources = sources.len()))]
pub async fn run_once(
    config: &PipelineConfig,
    sources: &[Arc<dyn PostSource>],
    query: &FetchQuery,
    run_date: NaiveDate,
    sinks: &[Box<dyn Sink>],
) -> Result<RunReport, AggregationError> {
    let collected = collect_all(sources, query, RetryPolicy::from_config(config)).await;

    let mut posts = Vec::new();
    let mut platforms = Vec::with_capacity(collected.len());
    let mut errors = Vec::new();

    for result in collected {
        let batch = normalize_batch(result.platform, &result.payloads);
        if batch.rejected() > 0 {
            warn!(
                platform = %result.platform,
                rejected = batch.rejected(),
                "Dropped payloads that failed normalization"
            );
        }

        platforms.push(PlatformOutcome {
            platform: result.platform,
            fetched: result.payloads.len(),
            normalized: batch.posts.len(),
            rejected: batch.rejected(),
            attempts: result.attempts,
            error: result.error.clone(),
        });
        errors.extend(result.error);
        posts.extend(batch.posts);
    }

    let posts_rejected: usize = platforms.iter().map(|p| p.rejected).sum();
    let analysis = analyze_posts(&config.analytics, posts, run_date)?;

    let output = RunOutput {
        run_date,
        posts: &analysis.posts,
        summary: &analysis.summary,
    };
    let (saved_outputs, sink_errors) = deliver(sinks, &output).await;
    let success = sink_errors.is_empty();
    errors.extend(sink_errors);

    info!(
        success,
        posts = analysis.posts.len(),
        rejected = posts_rejected,
        errors = errors.len(),
        "Run finished"
    );

    Ok(RunReport {
        success,
        run_date,
        posts_collected: analysis.posts.len(),
        posts_rejected,
        duplicates_merged: analysis.duplicates_merged,
        platforms,
        errors,
        saved_outputs,
        summary: analysis.summary,
    })
}
