//! Data types produced by the analytics pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Platform;

/// Totals for one `(date, platform)` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub platform: Platform,
    pub total_posts: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    pub total_engagement: u64,
    pub avg_engagement_per_post: f64,
}

/// A ranked entry in a top-posts list. `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPost {
    pub rank: usize,
    pub post_id: String,
    pub platform: Platform,
    pub content: String,
    pub author_name: String,
    pub engagement_score: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub post_date: DateTime<Utc>,
}

/// Per-post engagement averaged over the `window_days` ending at `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverage {
    pub platform: Platform,
    pub date: NaiveDate,
    pub window_days: u32,
    pub average_engagement: f64,
    /// Posts that fell inside the window.
    pub post_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub post_id: String,
    pub platform: Platform,
    pub engagement_score: u64,
    pub z_score: f64,
}

/// Outlier scan over one population of posts.
///
/// `platform` is `None` for the cross-platform population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub platform: Option<Platform>,
    pub sample_size: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
    pub anomalies: Vec<Anomaly>,
}

/// Count of posts per engagement tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementDistribution {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

/// Side-by-side statistics for one platform across the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub platform: Platform,
    pub total_posts: u64,
    pub total_engagement: u64,
    pub avg_engagement_per_post: f64,
    pub avg_likes_per_post: f64,
    pub avg_comments_per_post: f64,
    pub avg_shares_per_post: f64,
    pub max_engagement: u64,
    pub distribution: EngagementDistribution,
}

/// Complete analytics result for one run, written by every sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub date: NaiveDate,
    pub posts_analyzed: usize,
    pub daily_metrics: Vec<DailyMetrics>,
    pub top_posts_overall: Vec<TopPost>,
    pub top_posts_per_platform: BTreeMap<Platform, Vec<TopPost>>,
    pub moving_averages: Vec<MovingAverage>,
    pub platform_comparison: Vec<PlatformStats>,
    pub anomalies_overall: AnomalyReport,
    pub anomalies_per_platform: BTreeMap<Platform, AnomalyReport>,
}
