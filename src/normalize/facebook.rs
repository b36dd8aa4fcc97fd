use super::FieldMap;
use super::fields::extract_marked;
use crate::model::{Post, RawPayload};

/// Graph API post objects requested with
/// `fields=id,message,created_time,from,likes.summary(true),comments.summary(true),shares`.
pub(super) static FIELDS: FieldMap = FieldMap {
    post_id: &["id"],
    content: &["message"],
    author_id: &["from.id"],
    author_name: &["from.name"],
    likes: &["likes.summary.total_count", "reactions.summary.total_count"],
    comments: &["comments.summary.total_count"],
    shares: &["shares.count"],
    post_date: &["created_time"],
    views: &[],
    url: &["permalink_url"],
};

pub(super) fn enrich(_payload: &RawPayload, post: &mut Post) {
    post.hashtags = extract_marked(&post.content, '#');
    post.mentions = extract_marked(&post.content, '@');
}
