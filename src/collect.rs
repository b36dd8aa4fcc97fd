//! Concurrent collection across platform sources.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, error, info};

use crate::model::Platform;
use crate::retry::{RetryPolicy, retry_fixed};
use crate::sources::{FetchQuery, PostSource};

/// Raw payloads from one source, or why there are none.
#[derive(Debug)]
pub struct Collected {
    pub platform: Platform,
    pub payloads: Vec<Value>,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Fetches every source in its own task with the retry budget applied.
///
/// A platform that fails, times out or panics contributes no payloads and an
/// error message; it never aborts the others. Results follow source order.
pub async fn collect_all(
    sources: &[Arc<dyn PostSource>],
    query: &FetchQuery,
    policy: RetryPolicy,
) -> Vec<Collected> {
    let query = Arc::new(query.clone());
    let mut tasks = Vec::with_capacity(sources.len());

    for source in sources {
        let source = Arc::clone(source);
        let query = Arc::clone(&query);
        let platform = source.platform();
        let span = tracing::info_span!("fetch_platform", %platform);

        let task = tokio::spawn(
            async move {
                let attempted = retry_fixed(&policy, || source.fetch(&query)).await;
                match attempted.result {
                    Ok(payloads) => {
                        info!(count = payloads.len(), attempts = attempted.attempts, "Platform fetched");
                        Collected {
                            platform,
                            payloads,
                            attempts: attempted.attempts,
                            error: None,
                        }
                    }
                    Err(err) => {
                        error!(attempts = attempted.attempts, error = %err, "Platform fetch failed");
                        Collected {
                            platform,
                            payloads: Vec::new(),
                            attempts: attempted.attempts,
                            error: Some(format!(
                                "{platform}: fetch failed after {} attempt(s): {err}",
                                attempted.attempts
                            )),
                        }
                    }
                }
            }
            .instrument(span),
        );
        tasks.push((platform, task));
    }

    let mut collected = Vec::with_capacity(tasks.len());
    for (platform, task) in tasks {
        match task.await {
            Ok(result) => collected.push(result),
            Err(e) => {
                error!(%platform, error = %e, "Fetch task did not complete");
                collected.push(Collected {
                    platform,
                    payloads: Vec::new(),
                    attempts: 0,
                    error: Some(format!("{platform}: fetch task failed: {e}")),
                });
            }
        }
    }
    collected
}
