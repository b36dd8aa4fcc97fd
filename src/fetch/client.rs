use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Auth wrappers implement this by editing the
/// request and delegating to an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
