use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::anomaly::detect_anomalies;
use crate::analyzers::comparison::compare_platforms;
use crate::analyzers::types::{AnalyticsSummary, AnomalyReport};
use crate::config::AnalyticsConfig;
use crate::error::AggregationError;
use crate::model::{Platform, Post};

/// Builds the analytics summary for `date` from a normalized batch.
///
/// An empty batch is a valid day and produces a summary with empty lists.
/// The result depends only on the arguments: the same batch in any order
/// yields an identical summary.
///
/// # Errors
///
/// Returns [`AggregationError`] when the batch breaks a normalizer
/// invariant (duplicate or empty ids, counter overflow).
pub fn build_summary(
    date: NaiveDate,
    posts: &[Post],
    config: &AnalyticsConfig,
) -> Result<AnalyticsSummary, AggregationError> {
    let threshold = config.anomaly_threshold;
    if posts.is_empty() {
        return Ok(AnalyticsSummary {
            date,
            posts_analyzed: 0,
            daily_metrics: Vec::new(),
            top_posts_overall: Vec::new(),
            top_posts_per_platform: BTreeMap::new(),
            moving_averages: Vec::new(),
            platform_comparison: Vec::new(),
            anomalies_overall: detect_anomalies(posts, threshold, None),
            anomalies_per_platform: BTreeMap::new(),
        });
    }

    let aggregation = aggregate(posts, config)?;

    // Canonical order makes anomaly output independent of input order.
    let mut ordered: Vec<&Post> = posts.iter().collect();
    ordered.sort_by(|a, b| {
        a.platform
            .cmp(&b.platform)
            .then_with(|| a.post_id.cmp(&b.post_id))
    });

    let mut per_platform: BTreeMap<Platform, Vec<&Post>> = BTreeMap::new();
    for &post in &ordered {
        per_platform.entry(post.platform).or_default().push(post);
    }
    let anomalies_per_platform: BTreeMap<Platform, AnomalyReport> = per_platform
        .into_iter()
        .map(|(platform, group)| {
            (
                platform,
                detect_anomalies(group, threshold, Some(platform)),
            )
        })
        .collect();

    Ok(AnalyticsSummary {
        date,
        posts_analyzed: posts.len(),
        daily_metrics: aggregation.daily_metrics,
        top_posts_overall: aggregation.top_posts_overall,
        top_posts_per_platform: aggregation.top_posts_per_platform,
        moving_averages: aggregation.moving_averages,
        platform_comparison: compare_platforms(posts),
        anomalies_overall: detect_anomalies(ordered, threshold, None),
        anomalies_per_platform,
    })
}
