use std::collections::BTreeMap;

use crate::analyzers::tier::{EngagementTier, tier};
use crate::analyzers::types::{EngagementDistribution, PlatformStats};
use crate::analyzers::utility::{ratio, round2};
use crate::model::{Platform, Post};

#[derive(Default)]
struct Totals {
    posts: u64,
    likes: u64,
    comments: u64,
    shares: u64,
    engagement: u64,
    max_engagement: u64,
    distribution: EngagementDistribution,
}

/// Per-platform statistics for every platform present in `posts`.
///
/// Totals saturate; batches reaching this point have already passed the
/// overflow checks in daily bucketing.
pub fn compare_platforms(posts: &[Post]) -> Vec<PlatformStats> {
    let mut totals: BTreeMap<Platform, Totals> = BTreeMap::new();

    for post in posts {
        let score = post.engagement_score();
        let t = totals.entry(post.platform).or_default();

        t.posts += 1;
        t.likes = t.likes.saturating_add(post.likes);
        t.comments = t.comments.saturating_add(post.comments);
        t.shares = t.shares.saturating_add(post.shares);
        t.engagement = t.engagement.saturating_add(score);
        t.max_engagement = t.max_engagement.max(score);

        match tier(score) {
            EngagementTier::Low => t.distribution.low += 1,
            EngagementTier::Medium => t.distribution.medium += 1,
            EngagementTier::High => t.distribution.high += 1,
        }
    }

    totals
        .into_iter()
        .map(|(platform, t)| PlatformStats {
            platform,
            total_posts: t.posts,
            total_engagement: t.engagement,
            avg_engagement_per_post: round2(ratio(t.engagement, t.posts)),
            avg_likes_per_post: round2(ratio(t.likes, t.posts)),
            avg_comments_per_post: round2(ratio(t.comments, t.posts)),
            avg_shares_per_post: round2(ratio(t.shares, t.posts)),
            max_engagement: t.max_engagement,
            distribution: t.distribution,
        })
        .collect()
}
