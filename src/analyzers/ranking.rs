use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::analyzers::types::TopPost;
use crate::model::{Platform, Post};
use crate::normalize::fields::truncate_chars;

const CONTENT_PREVIEW_CHARS: usize = 200;

/// Engagement descending, then most recent, then post id ascending.
/// Platform breaks the last tie so the order is total across platforms.
pub fn ranking_order(a: &Post, b: &Post) -> Ordering {
    b.engagement_score()
        .cmp(&a.engagement_score())
        .then_with(|| b.post_date.cmp(&a.post_date))
        .then_with(|| a.post_id.cmp(&b.post_id))
        .then_with(|| a.platform.cmp(&b.platform))
}

/// Sorts the whole batch once; every top-N list is a prefix filter of this.
pub fn rank_posts(posts: &[Post]) -> Vec<&Post> {
    let mut ranked: Vec<&Post> = posts.iter().collect();
    ranked.sort_by(|a, b| ranking_order(a, b));
    ranked
}

fn top_post(rank: usize, post: &Post) -> TopPost {
    TopPost {
        rank,
        post_id: post.post_id.clone(),
        platform: post.platform,
        content: truncate_chars(&post.content, CONTENT_PREVIEW_CHARS),
        author_name: post.author_name.clone(),
        engagement_score: post.engagement_score(),
        likes: post.likes,
        comments: post.comments,
        shares: post.shares,
        post_date: post.post_date,
    }
}

/// The first `limit` posts of an already ranked list.
pub fn top_posts(ranked: &[&Post], limit: usize) -> Vec<TopPost> {
    ranked
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, post)| top_post(i + 1, post))
        .collect()
}

/// The first `limit` posts of each platform present in the ranked list.
pub fn top_posts_per_platform(ranked: &[&Post], limit: usize) -> BTreeMap<Platform, Vec<TopPost>> {
    let mut per_platform: BTreeMap<Platform, Vec<TopPost>> = BTreeMap::new();

    for post in ranked {
        let list = per_platform.entry(post.platform).or_default();
        if list.len() < limit {
            list.push(top_post(list.len() + 1, post));
        }
    }

    per_platform
}
