use std::io::Write;

use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::SinkError;

/// Uploads run artifacts under `s3://{bucket}/{prefix}`.
#[derive(Clone)]
pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    gzip: bool,
}

impl S3Uploader {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: String::new(),
            gzip: false,
        }
    }

    /// Builds a client from the standard AWS environment/profile chain.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    /// Gzip bodies before upload; keys get a `.gz` suffix.
    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Uploads `value` as JSON and returns its `s3://` location.
    pub async fn put_json(&self, key: &str, value: &impl Serialize) -> Result<String, SinkError> {
        let body = serde_json::to_vec(value)?;
        self.put(key, body, "application/json").await
    }

    pub async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, SinkError> {
        let (body, key) = if self.gzip {
            (gzip_bytes(&body)?, format!("{}{key}.gz", self.prefix))
        } else {
            (body, format!("{}{key}", self.prefix))
        };
        debug!(bucket = %self.bucket, key = %key, bytes = body.len(), "Uploading to S3");

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type);
        if self.gzip {
            request = request.content_encoding("gzip");
        }
        request
            .send()
            .await
            .map_err(|e| SinkError::S3(format!("put {key}: {e}")))?;

        let location = format!("s3://{}/{key}", self.bucket);
        info!(location = %location, "Uploaded to S3");
        Ok(location)
    }
}

/// `""` stays empty; anything else ends with exactly one `/`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

pub fn gzip_bytes(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_bytes_decodes_back() {
        let input = b"post_id,platform\n1,twitter\n".repeat(20);
        let compressed = gzip_bytes(&input).unwrap();
        assert!(compressed.len() < input.len());

        let mut out = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("analytics"), "analytics/");
        assert_eq!(normalize_prefix("/runs/daily/"), "runs/daily/");
    }
}
