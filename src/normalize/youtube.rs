use super::FieldMap;
use super::fields::{extract_marked, first_string, truncate_chars};
use crate::model::{Post, RawPayload};

const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// `videos.list` items with `part=snippet,statistics`. Statistics arrive as
/// decimal strings. YouTube exposes no share count, so shares stay 0 and the
/// view count is carried for reporting only.
pub(super) static FIELDS: FieldMap = FieldMap {
    post_id: &["id", "id.videoId", "snippet.resourceId.videoId"],
    content: &[],
    author_id: &["snippet.channelId", "channelId"],
    author_name: &["snippet.channelTitle", "channelTitle"],
    likes: &["statistics.likeCount", "likeCount"],
    comments: &["statistics.commentCount", "commentCount"],
    shares: &[],
    post_date: &["snippet.publishedAt", "publishedAt"],
    views: &["statistics.viewCount", "viewCount"],
    url: &[],
};

pub(super) fn enrich(payload: &RawPayload, post: &mut Post) {
    let title = first_string(payload, &["snippet.title", "title"]).unwrap_or_default();
    let description =
        first_string(payload, &["snippet.description", "description"]).unwrap_or_default();

    post.content = format!(
        "{title}\n\n{}",
        truncate_chars(&description, DESCRIPTION_PREVIEW_CHARS)
    )
    .trim()
    .to_string();
    post.hashtags = extract_marked(&description, '#');
    post.url = Some(format!("https://www.youtube.com/watch?v={}", post.post_id));
}
