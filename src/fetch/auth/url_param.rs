use async_trait::async_trait;

use crate::fetch::client::HttpClient;

/// An [`HttpClient`] wrapper that appends a credential as a URL query
/// parameter, e.g. `access_token` for the Graph API or `key` for YouTube.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        // Pagination links from the Graph API already carry the token.
        let present = req.url().query_pairs().any(|(k, _)| k == self.param_name);
        if !present {
            req.url_mut()
                .query_pairs_mut()
                .append_pair(&self.param_name, &self.key);
        }
        self.inner.execute(req).await
    }
}
