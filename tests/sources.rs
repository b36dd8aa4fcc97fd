//! Integration tests for the HTTP platform sources.
//!
//! Each test stands up a `wiremock` server and points a source at it through
//! its base URL, so request shapes, pagination and auth are checked without
//! real network traffic.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use social_analytics::error::FetchError;
use social_analytics::fetch::auth::{ApiKey, UrlParam};
use social_analytics::fetch::{BasicClient, Url};
use social_analytics::model::Platform;
use social_analytics::normalize::normalize_batch;
use social_analytics::sources::{
    FacebookSource, FetchQuery, PostSource, TwitterSource, YoutubeSource,
};

fn http() -> BasicClient {
    BasicClient::new(Duration::from_secs(5)).expect("failed to build test client")
}

fn base(server: &MockServer, prefix: &str) -> Url {
    Url::parse(&format!("{}/{prefix}/", server.uri())).unwrap()
}

fn search(text: &str) -> FetchQuery {
    FetchQuery {
        queries: vec![text.to_string()],
        ..FetchQuery::default()
    }
}

// ---------------------------------------------------------------------------
// Twitter
// ---------------------------------------------------------------------------

fn tweet(id: &str, likes: u64) -> serde_json::Value {
    json!({
        "id": id,
        "text": "hello #rust",
        "author_id": "10",
        "created_at": "2024-03-01T09:00:00.000Z",
        "public_metrics": {"like_count": likes, "reply_count": 1, "retweet_count": 2}
    })
}

#[tokio::test]
async fn twitter_search_follows_next_token_and_joins_authors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("next_token", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": [tweet("2", 3)],
            "includes": {"users": [{"id": "10", "username": "alice"}]},
            "meta": {"result_count": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("query", "rust"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": [tweet("1", 7)],
            "includes": {"users": [{"id": "10", "username": "alice"}]},
            "meta": {"result_count": 1, "next_token": "page2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiKey::bearer(http(), "secret").unwrap();
    let source = TwitterSource::new(client, base(&server, "2"));
    let payloads = source.fetch(&search("rust")).await.unwrap();

    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["author_username"], "alice");

    let batch = normalize_batch(Platform::Twitter, &payloads);
    assert_eq!(batch.rejected(), 0);
    assert_eq!(batch.posts[0].author_name, "alice");
    assert_eq!(batch.posts[0].engagement_score(), 10);
}

#[tokio::test]
async fn twitter_user_timeline_when_no_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": [tweet("1", 1), tweet("2", 2), tweet("3", 3)],
            "meta": {"result_count": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = FetchQuery {
        user_ids: [(Platform::Twitter, "42".to_string())].into(),
        limit: 2,
        ..FetchQuery::default()
    };
    let source = TwitterSource::new(http(), base(&server, "2"));
    let payloads = source.fetch(&query).await.unwrap();

    assert_eq!(payloads.len(), 2);
}

#[tokio::test]
async fn twitter_rate_limit_is_retryable_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let source = TwitterSource::new(http(), base(&server, "2"));
    let err = source.fetch(&search("rust")).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 429, .. }));
    assert!(err.is_retryable());
}

// ---------------------------------------------------------------------------
// Facebook
// ---------------------------------------------------------------------------

fn fb_post(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "message": "hello",
        "created_time": "2024-03-01T08:00:00+0000",
        "from": {"id": "99", "name": "Page"},
        "likes": {"summary": {"total_count": 4}},
        "comments": {"summary": {"total_count": 1}},
        "shares": {"count": 1}
    })
}

#[tokio::test]
async fn facebook_page_posts_follow_paging_next_with_token() {
    let server = MockServer::start().await;
    let next = format!("{}/v18.0/acme/posts?after=cursor1", server.uri());

    Mock::given(method("GET"))
        .and(path("/v18.0/acme/posts"))
        .and(query_param("after", "cursor1"))
        .and(query_param("access_token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": [fb_post("99_2")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v18.0/acme/posts"))
        .and(query_param("access_token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": [fb_post("99_1")],
            "paging": {"next": next}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = FetchQuery {
        user_ids: [(Platform::Facebook, "acme".to_string())].into(),
        ..FetchQuery::default()
    };
    let client = UrlParam::new(http(), "access_token", "tok");
    let source = FacebookSource::new(client, base(&server, "v18.0"));
    let payloads = source.fetch(&query).await.unwrap();

    let batch = normalize_batch(Platform::Facebook, &payloads);
    let ids: Vec<_> = batch.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["99_1", "99_2"]);
    assert_eq!(batch.posts[0].engagement_score(), 6);
}

#[tokio::test]
async fn facebook_auth_error_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v18.0/search"))
        .respond_with(ResponseTemplate::new(400).set_body_json(&json!({
            "error": {"message": "Invalid OAuth access token.", "code": 190}
        })))
        .mount(&server)
        .await;

    let source = FacebookSource::new(http(), base(&server, "v18.0"));
    let err = source.fetch(&search("coffee")).await.unwrap_err();

    match &err {
        FetchError::Status { status, body } => {
            assert_eq!(*status, 400);
            assert!(body.contains("Invalid OAuth"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
}

// ---------------------------------------------------------------------------
// YouTube
// ---------------------------------------------------------------------------

fn video(id: &str, likes: &str) -> serde_json::Value {
    json!({
        "id": id,
        "snippet": {
            "publishedAt": "2024-03-01T12:00:00Z",
            "channelId": "UC1",
            "channelTitle": "Channel",
            "title": "Video",
            "description": "desc"
        },
        "statistics": {"viewCount": "100", "likeCount": likes, "commentCount": "1"}
    })
}

#[tokio::test]
async fn youtube_search_then_videos_with_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .and(query_param("q", "tokio"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "a"}},
                {"id": {"kind": "youtube#video", "videoId": "b"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("id", "a,b"))
        .and(query_param("part", "snippet,statistics"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "items": [video("a", "10"), video("b", "20")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = UrlParam::new(http(), "key", "yt-key");
    let source = YoutubeSource::new(client, base(&server, "youtube/v3"));
    let payloads = source.fetch(&search("tokio")).await.unwrap();

    let batch = normalize_batch(Platform::Youtube, &payloads);
    let scores: Vec<_> = batch.posts.iter().map(|p| p.engagement_score()).collect();
    assert_eq!(scores, vec![11, 21]);
    assert_eq!(batch.posts[0].views, Some(100));
}

#[tokio::test]
async fn youtube_most_popular_when_nothing_requested() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .and(query_param("chart", "mostPopular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "items": [video("p1", "5")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = YoutubeSource::new(http(), base(&server, "youtube/v3"));
    let payloads = source.fetch(&FetchQuery::default()).await.unwrap();

    assert_eq!(payloads.len(), 1);
}
