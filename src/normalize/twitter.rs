use super::FieldMap;
use super::fields::{extract_marked, string_list};
use crate::model::{Post, RawPayload};

/// API v2 tweet objects, with v1.1 field names as fallbacks. The source
/// attaches `author_username` from the `includes.users` expansion.
pub(super) static FIELDS: FieldMap = FieldMap {
    post_id: &["id", "id_str"],
    content: &["text", "full_text"],
    author_id: &["author_id", "user.id_str", "user.id"],
    author_name: &["author_username", "username", "author_name", "user.screen_name"],
    likes: &["public_metrics.like_count", "favorite_count", "like_count"],
    comments: &["public_metrics.reply_count", "reply_count"],
    shares: &["public_metrics.retweet_count", "retweet_count"],
    post_date: &["created_at"],
    views: &["public_metrics.impression_count"],
    url: &["url"],
};

pub(super) fn enrich(payload: &RawPayload, post: &mut Post) {
    post.hashtags = string_list(payload, "entities.hashtags", &["tag", "text"])
        .unwrap_or_else(|| extract_marked(&post.content, '#'));
    post.mentions = string_list(payload, "entities.mentions", &["username", "screen_name"])
        .or_else(|| string_list(payload, "entities.user_mentions", &["screen_name"]))
        .unwrap_or_else(|| extract_marked(&post.content, '@'));

    if post.url.is_none() {
        post.url = Some(format!("https://twitter.com/i/web/status/{}", post.post_id));
    }
}
