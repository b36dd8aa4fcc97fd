use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{FetchQuery, PostSource, array_items, base_url, join, string_at};
use crate::error::FetchError;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, Url, fetch_json};
use crate::model::Platform;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v18.0/";
const POST_FIELDS: &str =
    "id,message,created_time,from,likes.summary(true),comments.summary(true),shares,permalink_url";
/// Pages read when neither a query nor a page id is given.
const DEFAULT_PAGES: [&str; 11] = [
    "CNN", "BBCNews", "FoxNews", "NBCNews", "ESPN", "NBA", "NFL", "MLB", "Netflix", "Disney",
    "Marvel",
];
const MAX_PAGE: usize = 100;

/// Facebook Graph API: page feeds and post search.
pub struct FacebookSource<C> {
    client: C,
    base_url: Url,
    page_size: usize,
}

impl FacebookSource<UrlParam<BasicClient>> {
    pub fn with_token(http: BasicClient, access_token: &str) -> Result<Self, FetchError> {
        let client = UrlParam::new(http, "access_token", access_token);
        Ok(Self::new(client, base_url(DEFAULT_BASE_URL)?))
    }
}

impl<C: HttpClient> FacebookSource<C> {
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

    async fn page_posts(&self, page_id: &str, query: &FetchQuery, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([page_id, "posts"]);
        self.with_window(&mut url, query, limit);
        self.paginate(url, limit).await
    }

    async fn search(&self, text: &str, query: &FetchQuery, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut url = join(&self.base_url, "search")?;
        url.query_pairs_mut()
            .append_pair("q", text)
            .append_pair("type", "post");
        self.with_window(&mut url, query, limit);
        self.paginate(url, limit).await
    }

    fn with_window(&self, url: &mut Url, query: &FetchQuery, limit: usize) {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("fields", POST_FIELDS)
            .append_pair("limit", &limit.min(self.page_size).to_string());
        if let Some(since) = query.since {
            pairs.append_pair("since", &since.timestamp().to_string());
        }
        if let Some(until) = query.until {
            pairs.append_pair("until", &until.timestamp().to_string());
        }
    }

    /// Follows absolute `paging.next` links until `limit` posts are collected.
    async fn paginate(&self, first: Url, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut posts: Vec<Value> = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            if posts.len() >= limit {
                break;
            }
            let body = fetch_json(&self.client, url).await?;
            let page = array_items(&body, "data");
            debug!(count = page.len(), "Fetched Graph API page");
            if page.is_empty() {
                break;
            }
            posts.extend(page);

            next = string_at(&body, &["paging", "next"])
                .map(|link| Url::parse(link).map_err(|e| FetchError::Url(format!("{link}: {e}"))))
                .transpose()?;
        }

        posts.truncate(limit);
        Ok(posts)
    }
}

#[async_trait]
impl<C: HttpClient> PostSource for FacebookSource<C> {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, FetchError> {
        let mut posts: Vec<Value> = Vec::new();

        if !query.queries.is_empty() {
            for text in &query.queries {
                let remaining = query.remaining(posts.len());
                if remaining == 0 {
                    break;
                }
                posts.extend(self.search(text, query, remaining).await?);
            }
            return Ok(posts);
        }

        if let Some(page_id) = query.user_id(Platform::Facebook) {
            return self.page_posts(page_id, query, query.remaining(0)).await;
        }

        let mut last_error = None;
        for page_id in DEFAULT_PAGES {
            let remaining = query.remaining(posts.len());
            if remaining == 0 {
                break;
            }
            match self.page_posts(page_id, query, remaining).await {
                Ok(found) => posts.extend(found),
                Err(e) => {
                    warn!(page = page_id, error = %e, "Default page fetch failed, skipping");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if posts.is_empty() => Err(e),
            _ => Ok(posts),
        }
    }
}
