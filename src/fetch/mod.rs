//! HTTP plumbing shared by the platform sources.
//!
//! Sources talk to an [`HttpClient`], so credentials are layered on by
//! wrapping: [`auth::ApiKey`] for header tokens and [`auth::UrlParam`] for
//! query-string keys.

pub mod auth;
mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use reqwest::Url;

use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// Longest slice of an error body kept in [`FetchError::Status`].
const ERROR_BODY_CHARS: usize = 500;

/// GETs `url` and decodes the body as JSON.
///
/// Non-2xx responses become [`FetchError::Status`] carrying the start of
/// the body, so rate-limit and server errors can be told apart from
/// permanent ones.
pub async fn fetch_json<C: HttpClient + ?Sized>(client: &C, url: Url) -> Result<Value, FetchError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);
    debug!(url = %redacted(req.url()), "GET");

    let resp = client.execute(req).await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body)
                .chars()
                .take(ERROR_BODY_CHARS)
                .collect(),
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

/// The URL without its query string, which may carry credentials.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
