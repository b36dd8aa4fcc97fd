use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

use crate::error::FetchError;
use crate::fetch::client::HttpClient;

/// An [`HttpClient`] wrapper that sends a credential as an HTTP header.
///
/// The header is validated once at construction and marked sensitive so it
/// never shows up in debug output.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self, FetchError> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|_| FetchError::InvalidCredential("header name"))?;
        let mut value =
            HeaderValue::from_str(key).map_err(|_| FetchError::InvalidCredential("header"))?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// `Authorization: Bearer <token>`, as used by the Twitter API.
    pub fn bearer(inner: C, token: &str) -> Result<Self, FetchError> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
