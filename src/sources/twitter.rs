use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{FetchQuery, PostSource, array_items, base_url, join, string_at};
use crate::error::FetchError;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, Url, fetch_json};
use crate::model::Platform;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2/";
const TWEET_FIELDS: &str = "created_at,public_metrics,author_id,entities";
const USER_FIELDS: &str = "username,name";
/// Searched when neither a query nor a user is given.
const TRENDING_HASHTAGS: [&str; 5] = ["#tech", "#news", "#politics", "#sports", "#entertainment"];
const MIN_PAGE: usize = 10;
const MAX_PAGE: usize = 100;

/// Twitter API v2: recent search and user timelines.
pub struct TwitterSource<C> {
    client: C,
    base_url: Url,
    page_size: usize,
}

impl TwitterSource<ApiKey<BasicClient>> {
    pub fn with_token(http: BasicClient, bearer_token: &str) -> Result<Self, FetchError> {
        let client = ApiKey::bearer(http, bearer_token)?;
        Ok(Self::new(client, base_url(DEFAULT_BASE_URL)?))
    }
}

impl<C: HttpClient> TwitterSource<C> {
    pub fn new(client: C, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            page_size: MAX_PAGE,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(MIN_PAGE, MAX_PAGE);
        self
    }

    async fn search(&self, text: &str, query: &FetchQuery, collected: usize) -> Result<Vec<Value>, FetchError> {
        let mut url = join(&self.base_url, "tweets/search/recent")?;
        url.query_pairs_mut().append_pair("query", text);
        self.with_window(&mut url, query);
        self.paginate(url, "next_token", query.remaining(collected)).await
    }

    async fn user_tweets(&self, user_id: &str, query: &FetchQuery) -> Result<Vec<Value>, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", user_id, "tweets"]);
        self.with_window(&mut url, query);
        self.paginate(url, "pagination_token", query.remaining(0)).await
    }

    fn with_window(&self, url: &mut Url, query: &FetchQuery) {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("tweet.fields", TWEET_FIELDS)
            .append_pair("user.fields", USER_FIELDS)
            .append_pair("expansions", "author_id");
        if let Some(since) = query.since {
            pairs.append_pair("start_time", &since.to_rfc3339());
        }
        if let Some(until) = query.until {
            pairs.append_pair("end_time", &until.to_rfc3339());
        }
    }

    /// Follows `meta.next_token` until `limit` tweets are collected.
    async fn paginate(&self, url: Url, token_param: &str, limit: usize) -> Result<Vec<Value>, FetchError> {
        let mut tweets: Vec<Value> = Vec::new();
        let mut token: Option<String> = None;

        while tweets.len() < limit {
            let mut page_url = url.clone();
            {
                let mut pairs = page_url.query_pairs_mut();
                let page = (limit - tweets.len()).clamp(MIN_PAGE, self.page_size);
                pairs.append_pair("max_results", &page.to_string());
                if let Some(token) = &token {
                    pairs.append_pair(token_param, token);
                }
            }

            let body = fetch_json(&self.client, page_url).await?;
            let page = with_author_names(&body);
            debug!(count = page.len(), "Fetched tweet page");
            if page.is_empty() {
                break;
            }
            tweets.extend(page);

            match string_at(&body, &["meta", "next_token"]) {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }

        tweets.truncate(limit);
        Ok(tweets)
    }
}

/// Tweets from `data` with `author_username` joined from `includes.users`.
fn with_author_names(body: &Value) -> Vec<Value> {
    let users: HashMap<&str, &Value> = body
        .pointer("/includes/users")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|u| Some((u.get("id")?.as_str()?, u.get("username")?)))
        .collect();

    array_items(body, "data")
        .into_iter()
        .map(|mut tweet| {
            let author = tweet
                .get("author_id")
                .and_then(Value::as_str)
                .and_then(|id| users.get(id))
                .map(|name| (*name).clone());
            if let (Some(name), Some(fields)) = (author, tweet.as_object_mut()) {
                fields.insert("author_username".to_string(), name);
            }
            tweet
        })
        .collect()
}

#[async_trait]
impl<C: HttpClient> PostSource for TwitterSource<C> {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, FetchError> {
        if query.queries.is_empty() {
            if let Some(user_id) = query.user_id(Platform::Twitter) {
                return self.user_tweets(user_id, query).await;
            }
        }

        let trending = query.queries.is_empty();
        let searches: Vec<&str> = if trending {
            TRENDING_HASHTAGS.to_vec()
        } else {
            query.queries.iter().map(String::as_str).collect()
        };

        let mut tweets: Vec<Value> = Vec::new();
        let mut last_error = None;
        for text in searches {
            if query.remaining(tweets.len()) == 0 {
                break;
            }
            match self.search(text, query, tweets.len()).await {
                Ok(found) => tweets.extend(found),
                Err(e) if trending => {
                    warn!(hashtag = text, error = %e, "Trending search failed, skipping");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) if tweets.is_empty() => Err(e),
            _ => Ok(tweets),
        }
    }
}
