//! Daily bucketing and the aggregation engine entry point.
//!
//! One pass over the batch validates it and folds every post into a
//! `(date, platform)` bucket. Daily metrics and moving averages are both
//! derived from those buckets; rankings come from a single sort.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::analyzers::moving_average::moving_averages;
use crate::analyzers::ranking::{rank_posts, top_posts, top_posts_per_platform};
use crate::analyzers::types::{DailyMetrics, MovingAverage, TopPost};
use crate::analyzers::utility::{ratio, round2};
use crate::config::AnalyticsConfig;
use crate::error::AggregationError;
use crate::model::{Platform, Post};

/// Running totals for one `(date, platform)` partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayBucket {
    pub posts: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub engagement: u64,
}

impl DayBucket {
    fn add(&mut self, post: &Post) -> Result<(), AggregationError> {
        let score = post
            .likes
            .checked_add(post.comments)
            .and_then(|s| s.checked_add(post.shares))
            .ok_or(AggregationError::Overflow {
                what: "engagement_score",
            })?;

        self.posts = checked(self.posts, 1, "total_posts")?;
        self.likes = checked(self.likes, post.likes, "total_likes")?;
        self.comments = checked(self.comments, post.comments, "total_comments")?;
        self.shares = checked(self.shares, post.shares, "total_shares")?;
        self.engagement = checked(self.engagement, score, "total_engagement")?;
        Ok(())
    }
}

fn checked(total: u64, add: u64, what: &'static str) -> Result<u64, AggregationError> {
    total
        .checked_add(add)
        .ok_or(AggregationError::Overflow { what })
}

/// Buckets keyed by date first, so iteration is chronological.
pub type DailyBuckets = BTreeMap<(NaiveDate, Platform), DayBucket>;

/// Validates the batch and buckets every post by calendar day and platform.
///
/// # Errors
///
/// Fails when a post has an empty id, when `(platform, post_id)` repeats,
/// or when a running total overflows.
pub fn bucket_by_day(posts: &[Post]) -> Result<DailyBuckets, AggregationError> {
    let mut seen = HashSet::with_capacity(posts.len());
    let mut buckets = DailyBuckets::new();

    for post in posts {
        if post.post_id.is_empty() {
            return Err(AggregationError::EmptyPostId);
        }
        if !seen.insert((post.platform, post.post_id.as_str())) {
            return Err(AggregationError::DuplicatePost {
                platform: post.platform,
                post_id: post.post_id.clone(),
            });
        }

        buckets
            .entry((post.day(), post.platform))
            .or_default()
            .add(post)?;
    }

    Ok(buckets)
}

/// One row per non-empty bucket, ordered by date then platform.
pub fn daily_metrics(buckets: &DailyBuckets) -> Vec<DailyMetrics> {
    buckets
        .iter()
        .map(|(&(date, platform), bucket)| DailyMetrics {
            date,
            platform,
            total_posts: bucket.posts,
            total_likes: bucket.likes,
            total_comments: bucket.comments,
            total_shares: bucket.shares,
            total_engagement: bucket.engagement,
            avg_engagement_per_post: round2(ratio(bucket.engagement, bucket.posts)),
        })
        .collect()
}

/// Everything the aggregation engine derives from a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub daily_metrics: Vec<DailyMetrics>,
    pub top_posts_overall: Vec<TopPost>,
    pub top_posts_per_platform: BTreeMap<Platform, Vec<TopPost>>,
    pub moving_averages: Vec<MovingAverage>,
}

/// Runs the aggregation engine over a normalized batch.
///
/// Input order does not matter; every output is fully ordered.
pub fn aggregate(posts: &[Post], config: &AnalyticsConfig) -> Result<Aggregation, AggregationError> {
    let buckets = bucket_by_day(posts)?;
    let ranked = rank_posts(posts);

    Ok(Aggregation {
        daily_metrics: daily_metrics(&buckets),
        top_posts_overall: top_posts(&ranked, config.top_overall),
        top_posts_per_platform: top_posts_per_platform(&ranked, config.top_per_platform),
        moving_averages: moving_averages(&buckets, &config.moving_average_windows),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::post;

    #[test]
    fn test_two_posts_same_day() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 10, 5, 2),
            post("2", Platform::Twitter, (2024, 1, 1), 1, 0, 0),
        ];

        let agg = aggregate(&posts, &AnalyticsConfig::default()).unwrap();

        assert_eq!(agg.daily_metrics.len(), 1);
        let day = &agg.daily_metrics[0];
        assert_eq!(day.total_posts, 2);
        assert_eq!(day.total_likes, 11);
        assert_eq!(day.total_comments, 5);
        assert_eq!(day.total_shares, 2);
        assert_eq!(day.total_engagement, 18);
        assert_eq!(day.avg_engagement_per_post, 9.0);

        let ids: Vec<_> = agg
            .top_posts_overall
            .iter()
            .map(|t| (t.post_id.as_str(), t.engagement_score))
            .collect();
        assert_eq!(ids, vec![("1", 17), ("2", 1)]);
    }

    #[test]
    fn test_empty_partitions_are_omitted() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 1, 0, 0),
            post("2", Platform::Youtube, (2024, 1, 3), 1, 0, 0),
        ];
        let buckets = bucket_by_day(&posts).unwrap();
        let metrics = daily_metrics(&buckets);

        let keys: Vec<_> = metrics
            .iter()
            .map(|m| (m.date.to_string(), m.platform))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2024-01-01".to_string(), Platform::Twitter),
                ("2024-01-03".to_string(), Platform::Youtube),
            ]
        );
    }

    #[test]
    fn test_bucket_totals_match_counters() {
        let posts = vec![
            post("1", Platform::Facebook, (2024, 1, 1), 3, 4, 5),
            post("2", Platform::Facebook, (2024, 1, 1), 7, 0, 1),
            post("3", Platform::Facebook, (2024, 1, 1), 0, 2, 0),
        ];
        let buckets = bucket_by_day(&posts).unwrap();
        let bucket = buckets.values().next().unwrap();

        assert_eq!(
            bucket.engagement,
            bucket.likes + bucket.comments + bucket.shares
        );
        assert_eq!(bucket.posts, 3);
    }

    #[test]
    fn test_same_id_on_different_platforms_is_allowed() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 1, 0, 0),
            post("1", Platform::Facebook, (2024, 1, 1), 1, 0, 0),
        ];
        assert!(bucket_by_day(&posts).is_ok());
    }

    #[test]
    fn test_duplicate_post_is_invariant_violation() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), 1, 0, 0),
            post("1", Platform::Twitter, (2024, 1, 2), 5, 0, 0),
        ];
        assert_eq!(
            bucket_by_day(&posts),
            Err(AggregationError::DuplicatePost {
                platform: Platform::Twitter,
                post_id: "1".into(),
            })
        );
    }

    #[test]
    fn test_empty_post_id_is_invariant_violation() {
        let posts = vec![post("", Platform::Twitter, (2024, 1, 1), 1, 0, 0)];
        assert_eq!(bucket_by_day(&posts), Err(AggregationError::EmptyPostId));
    }

    #[test]
    fn test_overflow_is_reported() {
        let posts = vec![
            post("1", Platform::Twitter, (2024, 1, 1), u64::MAX, 0, 0),
            post("2", Platform::Twitter, (2024, 1, 1), 1, 0, 0),
        ];
        assert_eq!(
            bucket_by_day(&posts),
            Err(AggregationError::Overflow {
                what: "total_likes"
            })
        );
    }

    #[test]
    fn test_input_order_does_not_change_output() {
        let mut posts = vec![
            post("a", Platform::Twitter, (2024, 1, 2), 5, 0, 0),
            post("b", Platform::Youtube, (2024, 1, 1), 5, 0, 0),
            post("c", Platform::Facebook, (2024, 1, 3), 9, 1, 0),
            post("d", Platform::Twitter, (2024, 1, 1), 2, 2, 2),
        ];
        let config = AnalyticsConfig::default();
        let forward = aggregate(&posts, &config).unwrap();
        posts.reverse();
        let backward = aggregate(&posts, &config).unwrap();

        assert_eq!(forward, backward);
    }
}
