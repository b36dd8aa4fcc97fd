use std::time::Duration;

use async_trait::async_trait;

use super::client::HttpClient;

const USER_AGENT: &str = concat!("social_analytics/", env!("CARGO_PKG_VERSION"));

/// Plain reqwest client with the crate's user agent.
#[derive(Clone)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// Builds a client whose every request is capped at `timeout`.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
