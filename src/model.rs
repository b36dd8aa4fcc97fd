//! Unified post schema shared by every platform.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement;
use crate::error::ValidationError;

/// A raw platform payload: platform-native field names mapped to JSON values.
pub type RawPayload = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Facebook,
    Youtube,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Twitter, Platform::Facebook, Platform::Youtube];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ValidationError::MissingField("platform")),
            "twitter" | "x" => Ok(Platform::Twitter),
            "facebook" => Ok(Platform::Facebook),
            "youtube" => Ok(Platform::Youtube),
            other => Err(ValidationError::UnknownPlatform(other.to_string())),
        }
    }
}

/// A normalized post.
///
/// The engagement score is never stored; [`Post::engagement_score`] derives it
/// from the counters on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub platform: Platform,
    #[serde(default)]
    pub content: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    pub post_date: DateTime<Utc>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

impl Post {
    pub fn engagement_score(&self) -> u64 {
        engagement::score(self.likes, self.comments, self.shares)
    }

    /// Calendar day (UTC) used for daily grouping.
    pub fn day(&self) -> NaiveDate {
        self.post_date.date_naive()
    }
}

/// Serialization view of a [`Post`] that includes the derived score.
#[derive(Serialize)]
pub struct ScoredPost<'a> {
    #[serde(flatten)]
    pub post: &'a Post,
    pub engagement_score: u64,
}

impl<'a> From<&'a Post> for ScoredPost<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            engagement_score: post.engagement_score(),
            post,
        }
    }
}
