use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{FetchQuery, PostSource};
use crate::error::FetchError;
use crate::model::Platform;

/// Raw payloads for one platform read from a JSON file on disk.
///
/// The file holds either an array of payloads or an API-shaped envelope
/// with the array under `data` (Twitter, Facebook) or `items` (YouTube).
/// Items are passed on as stored. Query filters other than `limit` are
/// ignored.
pub struct FileSource {
    platform: Platform,
    path: PathBuf,
}

impl FileSource {
    pub fn new(platform: Platform, path: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            path: path.into(),
        }
    }

    fn invalid(&self, reason: &str) -> FetchError {
        FetchError::InvalidSource {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl PostSource for FileSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Value>, FetchError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let value: Value = serde_json::from_slice(&bytes)?;

        let mut payloads = match value {
            Value::Array(items) => items,
            Value::Object(mut envelope) => match envelope
                .remove("data")
                .or_else(|| envelope.remove("items"))
            {
                Some(Value::Array(items)) => items,
                _ => return Err(self.invalid("expected a `data` or `items` array")),
            },
            _ => return Err(self.invalid("expected a JSON array")),
        };

        payloads.truncate(query.remaining(0));
        debug!(path = %self.path.display(), count = payloads.len(), "Loaded payloads from file");
        Ok(payloads)
    }
}
