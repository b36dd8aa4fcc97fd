use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{FetchQuery, PostSource, array_items, base_url, join, string_at};
use crate::error::FetchError;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, Url, fetch_json};
use crate::model::Platform;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const MAX_PAGE: usize = 50;
const TRENDING_REGION: &str = "US";

/// YouTube Data API v3.
///
/// Search and playlist endpoints return no statistics, so every mode ends
/// with a `videos.list` call that yields full `snippet,statistics` items.
pub struct YoutubeSource<C> {
    client: C,
    base_url: Url,
    page_size: usize,
}

impl YoutubeSource<UrlParam<BasicClient>> {
    pub fn with_key(http: BasicClient, api_key: &str) -> Result<Self, FetchError> {
        let client = UrlParam::new(http, "key", api_key);
        Ok(Self::new(client, base_url(DEFAULT_BASE_URL)?))
    }
}

impl<C: HttpClient> YoutubeSource<C> {
    pub fn new(client: C, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            page_size: MAX_PAGE,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE);
        self
    }

    fn endpoint(&self, name: &str, limit: usize) -> Result<Url, FetchError> {
        let mut url = join(&self.base_url, name)?;
        url.query_pairs_mut()
            .append_pair("maxResults", &limit.min(self.page_size).to_string());
        Ok(url)
    }

    /// Pages through `url`, collecting `extract(item)` until `limit` values.
    async fn paginate<T>(
        &self,
        url: Url,
        limit: usize,
        extract: impl Fn(&Value) -> Option<T> + Send + Sync,
    ) -> Result<Vec<T>, FetchError>
    where
        T: Send,
    {
        let mut out = Vec::new();
        let mut token: Option<String> = None;

        while out.len() < limit {
            let mut page_url = url.clone();
            if let Some(token) = &token {
                page_url.query_pairs_mut().append_pair("pageToken", token);
            }

            let body = fetch_json(&self.client, page_url).await?;
            let items = array_items(&body, "items");
            debug!(count = items.len(), "Fetched YouTube page");
            if items.is_empty() {
                break;
            }
            out.extend(items.iter().filter_map(&extract));

            match string_at(&body, &["nextPageToken"]) {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }

        out.truncate(limit);
        Ok(out)
    }

    async fn search(&self, text: &str, query: &FetchQuery, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut url = self.endpoint("search", limit)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("part", "snippet")
                .append_pair("type", "video")
                .append_pair("order", "relevance")
                .append_pair("q", text);
            if let Some(since) = query.since {
                pairs.append_pair("publishedAfter", &since.to_rfc3339());
            }
            if let Some(until) = query.until {
                pairs.append_pair("publishedBefore", &until.to_rfc3339());
            }
        }

        let ids = self
            .paginate(url, limit, |item| {
                item.get("id")
                    .and_then(|id| id.get("videoId"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .await?;
        self.videos(&ids).await
    }

    async fn channel_uploads(&self, channel_id: &str, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut url = join(&self.base_url, "channels")?;
        url.query_pairs_mut()
            .append_pair("part", "contentDetails")
            .append_pair("id", channel_id);
        let body = fetch_json(&self.client, url).await?;

        let Some(playlist) = body
            .pointer("/items/0/contentDetails/relatedPlaylists/uploads")
            .and_then(Value::as_str)
        else {
            debug!(channel_id, "Channel has no uploads playlist");
            return Ok(Vec::new());
        };

        let mut url = self.endpoint("playlistItems", limit)?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("playlistId", playlist);

        let ids = self
            .paginate(url, limit, |item| {
                item.get("snippet")
                    .and_then(|s| s.get("resourceId"))
                    .and_then(|r| r.get("videoId"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .await?;
        self.videos(&ids).await
    }

    async fn most_popular(&self, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut url = self.endpoint("videos", limit)?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,statistics")
            .append_pair("chart", "mostPopular")
            .append_pair("regionCode", TRENDING_REGION);
        self.paginate(url, limit, |item| Some(item.clone())).await
    }

    /// Full video resources for `ids`, in at most 50-id batches.
    async fn videos(&self, ids: &[String]) -> Result<Vec<Value>, FetchError> {
        let mut videos = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_PAGE) {
            let mut url = join(&self.base_url, "videos")?;
            url.query_pairs_mut()
                .append_pair("part", "snippet,statistics")
                .append_pair("id", &chunk.join(","));
            let body = fetch_json(&self.client, url).await?;
            videos.extend(array_items(&body, "items"));
        }
        Ok(videos)
    }
}

#[async_trait]
impl<C: HttpClient> PostSource for YoutubeSource<C> {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, FetchError> {
        if !query.queries.is_empty() {
            let mut videos: Vec<Value> = Vec::new();
            for text in &query.queries {
                let remaining = query.remaining(videos.len());
                if remaining == 0 {
                    break;
                }
                videos.extend(self.search(text, query, remaining).await?);
            }
            return Ok(videos);
        }

        match query.user_id(Platform::Youtube) {
            Some(channel_id) => self.channel_uploads(channel_id, query.remaining(0)).await,
            None => self.most_popular(query.remaining(0)).await,
        }
    }
}
