//! Where raw platform payloads come from.
//!
//! A source only has to satisfy [`PostSource`]: fetch a bounded list of raw
//! payloads for a query or fail with a [`FetchError`]. Normalization happens
//! downstream, so sources pass platform JSON through untouched apart from
//! joining in data the API returns out of line (Twitter author names,
//! YouTube statistics).

mod facebook;
mod file;
mod twitter;
mod youtube;

pub use facebook::FacebookSource;
pub use file::FileSource;
pub use twitter::TwitterSource;
pub use youtube::YoutubeSource;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::Credentials;
use crate::error::FetchError;
use crate::fetch::{BasicClient, Url};
use crate::model::Platform;

/// What to collect. Sources pick the first applicable mode: search
/// `queries`, else the platform's entry in `user_ids`, else the platform's
/// default trending feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchQuery {
    pub queries: Vec<String>,
    pub user_ids: BTreeMap<Platform, String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Maximum payloads per source. Zero means no limit.
    pub limit: usize,
}

impl FetchQuery {
    pub fn user_id(&self, platform: Platform) -> Option<&str> {
        self.user_ids.get(&platform).map(String::as_str)
    }

    /// Remaining capacity given `collected` payloads so far.
    pub(crate) fn remaining(&self, collected: usize) -> usize {
        if self.limit == 0 {
            usize::MAX
        } else {
            self.limit.saturating_sub(collected)
        }
    }
}

#[async_trait]
pub trait PostSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetches up to `query.limit` raw payloads.
    ///
    /// Items are passed on as the platform returned them, including any that
    /// are not objects; normalization rejects and counts those.
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, FetchError>;
}

/// Builds HTTP sources for every platform with credentials present.
pub fn from_credentials(
    credentials: &Credentials,
    timeout: Duration,
    page_size: usize,
) -> Result<Vec<Arc<dyn PostSource>>, FetchError> {
    let http = BasicClient::new(timeout)?;
    let mut sources: Vec<Arc<dyn PostSource>> = Vec::new();

    if let Some(token) = &credentials.twitter_bearer_token {
        sources.push(Arc::new(
            TwitterSource::with_token(http.clone(), token)?.page_size(page_size),
        ));
    }
    if let Some(token) = &credentials.facebook_access_token {
        sources.push(Arc::new(
            FacebookSource::with_token(http.clone(), token)?.page_size(page_size),
        ));
    }
    if let Some(key) = &credentials.youtube_api_key {
        sources.push(Arc::new(
            YoutubeSource::with_key(http, key)?.page_size(page_size),
        ));
    }

    Ok(sources)
}

/// Parses an API base URL, making sure relative joins land beneath it.
pub(crate) fn base_url(raw: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(raw).map_err(|e| FetchError::Url(format!("{raw}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, FetchError> {
    base.join(path)
        .map_err(|e| FetchError::Url(format!("{base}{path}: {e}")))
}

/// Items of the array at `value[key]`, or nothing when it is not an array.
pub(crate) fn array_items(value: &Value, key: &str) -> Vec<Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// String at a nested path such as `meta.next_token`.
pub(crate) fn string_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let base = base_url("http://localhost:1234/v2").unwrap();
        assert_eq!(
            join(&base, "tweets/search/recent").unwrap().as_str(),
            "http://localhost:1234/v2/tweets/search/recent"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(base_url("not a url"), Err(FetchError::Url(_))));
    }

    #[test]
    fn test_array_items_keeps_every_item() {
        let body = json!({"data": [{"id": "1"}, 7, "x", {"id": "2"}], "meta": {}});
        assert_eq!(array_items(&body, "data").len(), 4);
        assert!(array_items(&body, "meta").is_empty());
        assert!(array_items(&body, "missing").is_empty());
    }

    #[test]
    fn test_remaining_with_and_without_limit() {
        let mut query = FetchQuery::default();
        assert_eq!(query.remaining(1_000), usize::MAX);
        query.limit = 10;
        assert_eq!(query.remaining(4), 6);
        assert_eq!(query.remaining(12), 0);
    }

    #[test]
    fn test_string_at() {
        let body = json!({"meta": {"next_token": "abc", "empty": ""}});
        assert_eq!(string_at(&body, &["meta", "next_token"]), Some("abc"));
        assert_eq!(string_at(&body, &["meta", "empty"]), None);
        assert_eq!(string_at(&body, &["nope"]), None);
    }
}
