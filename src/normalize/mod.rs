//! Record normalization: raw platform payloads into the unified [`Post`].
//!
//! Each platform is a static [`FieldMap`] of candidate JSON paths plus one
//! `enrich` function for fields that need composing (YouTube content, tag
//! extraction, canonical URLs). Mandatory fields (`post_id`, `author_id`,
//! `post_date`, and the platform tag itself) reject the record when absent;
//! counters and text default.

mod facebook;
pub(crate) mod fields;
mod twitter;
mod youtube;

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::model::{Platform, Post, RawPayload};
use fields::{counter, first_string, first_value, parse_timestamp};

/// Candidate payload paths for each unified field, tried in order.
pub(crate) struct FieldMap {
    pub post_id: &'static [&'static str],
    pub content: &'static [&'static str],
    pub author_id: &'static [&'static str],
    pub author_name: &'static [&'static str],
    pub likes: &'static [&'static str],
    pub comments: &'static [&'static str],
    pub shares: &'static [&'static str],
    pub post_date: &'static [&'static str],
    pub views: &'static [&'static str],
    pub url: &'static [&'static str],
}

type Enrich = fn(&RawPayload, &mut Post);

fn mapping(platform: Platform) -> (&'static FieldMap, Enrich) {
    match platform {
        Platform::Twitter => (&twitter::FIELDS, twitter::enrich as Enrich),
        Platform::Facebook => (&facebook::FIELDS, facebook::enrich as Enrich),
        Platform::Youtube => (&youtube::FIELDS, youtube::enrich as Enrich),
    }
}

/// Maps one raw payload from `platform` into a [`Post`].
///
/// # Errors
///
/// Returns [`ValidationError`] when a mandatory field is missing or the
/// post date cannot be parsed.
pub fn normalize(platform: Platform, payload: &RawPayload) -> Result<Post, ValidationError> {
    let (fields, enrich) = mapping(platform);

    let post_id =
        first_string(payload, fields.post_id).ok_or(ValidationError::MissingField("post_id"))?;
    let author_id = first_string(payload, fields.author_id)
        .ok_or(ValidationError::MissingField("author_id"))?;
    let raw_date =
        first_value(payload, fields.post_date).ok_or(ValidationError::MissingField("post_date"))?;
    let post_date = parse_timestamp(raw_date).ok_or_else(|| ValidationError::InvalidTimestamp {
        field: "post_date",
        value: raw_date.to_string(),
    })?;

    let mut post = Post {
        post_id,
        platform,
        content: first_string(payload, fields.content).unwrap_or_default(),
        author_id,
        author_name: first_string(payload, fields.author_name).unwrap_or_default(),
        likes: counter(first_value(payload, fields.likes)),
        comments: counter(first_value(payload, fields.comments)),
        shares: counter(first_value(payload, fields.shares)),
        post_date,
        views: first_value(payload, fields.views).map(|v| counter(Some(v))),
        url: first_string(payload, fields.url),
        hashtags: Vec::new(),
        mentions: Vec::new(),
    };
    enrich(payload, &mut post);

    Ok(post)
}

/// Normalizes a payload carrying its own platform tag as a string.
///
/// # Errors
///
/// Rejects non-object payloads and empty or unknown platform tags in
/// addition to everything [`normalize`] rejects.
pub fn normalize_tagged(platform_tag: &str, payload: &Value) -> Result<Post, ValidationError> {
    let platform: Platform = platform_tag.parse()?;
    let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;
    normalize(platform, object)
}

/// A payload that failed normalization, by its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub error: ValidationError,
}

/// Outcome of normalizing one platform's payload list.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub platform: Platform,
    pub posts: Vec<Post>,
    pub rejections: Vec<Rejection>,
}

impl NormalizedBatch {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Normalizes every payload, dropping and recording the invalid ones.
///
/// Items that are not JSON objects are rejected as
/// [`ValidationError::NotAnObject`] at their position in the input.
pub fn normalize_batch(platform: Platform, payloads: &[Value]) -> NormalizedBatch {
    let mut posts = Vec::with_capacity(payloads.len());
    let mut rejections = Vec::new();

    for (index, payload) in payloads.iter().enumerate() {
        let normalized = payload
            .as_object()
            .ok_or(ValidationError::NotAnObject)
            .and_then(|object| normalize(platform, object));
        match normalized {
            Ok(post) => posts.push(post),
            Err(error) => {
                debug!(%platform, index, error = %error, "Rejected raw payload");
                rejections.push(Rejection { index, error });
            }
        }
    }

    NormalizedBatch {
        platform,
        posts,
        rejections,
    }
}
