//! Pipeline configuration.
//!
//! Everything is read once from the environment (after `.env` is loaded by
//! `dotenvy`) into immutable values that are passed explicitly into each
//! component. Unset variables fall back to defaults; set-but-unparsable
//! variables are errors.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::model::Platform;

/// Settings consumed by the analyzers.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    /// Size of the cross-platform top-posts list.
    pub top_overall: usize,
    /// Size of each per-platform top-posts list.
    pub top_per_platform: usize,
    /// Trailing windows, in days, for the moving averages.
    pub moving_average_windows: Vec<u32>,
    /// Standard deviations from the mean beyond which a post is anomalous.
    pub anomaly_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_overall: 5,
            top_per_platform: 3,
            moving_average_windows: vec![7, 30],
            anomaly_threshold: 2.0,
        }
    }
}

/// Settings for one collection + analytics run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Page size requested from platform APIs.
    pub batch_size: usize,
    /// Total fetch attempts per platform (first try included).
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Upper bound on a single fetch attempt.
    pub fetch_timeout: Duration,
    /// Maximum posts collected per platform.
    pub posts_limit: usize,
    /// Collection window when no explicit start date is given.
    pub lookback_days: u32,
    pub output_dir: PathBuf,
    pub database_path: PathBuf,
    pub analytics: AnalyticsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(60),
            posts_limit: 1000,
            lookback_days: 7,
            output_dir: PathBuf::from("./output"),
            database_path: PathBuf::from("./social_media_analytics.db"),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let analytics_defaults = AnalyticsConfig::default();

        let config = Self {
            batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.batch_size)?,
            max_retries: parse_or(&lookup, "MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_secs(parse_or(
                &lookup,
                "RETRY_DELAY",
                defaults.retry_delay.as_secs(),
            )?),
            fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_TIMEOUT",
                defaults.fetch_timeout.as_secs(),
            )?),
            posts_limit: parse_or(&lookup, "POSTS_LIMIT", defaults.posts_limit)?,
            lookback_days: parse_or(&lookup, "LOOKBACK_DAYS", defaults.lookback_days)?,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            analytics: AnalyticsConfig {
                top_overall: parse_or(&lookup, "TOP_POSTS_OVERALL", analytics_defaults.top_overall)?,
                top_per_platform: parse_or(
                    &lookup,
                    "TOP_POSTS_PER_PLATFORM",
                    analytics_defaults.top_per_platform,
                )?,
                moving_average_windows: analytics_defaults.moving_average_windows,
                anomaly_threshold: parse_or(
                    &lookup,
                    "ANOMALY_THRESHOLD",
                    analytics_defaults.anomaly_threshold,
                )?,
            },
        };

        if config.max_retries == 0 {
            anyhow::bail!("MAX_RETRIES must be at least 1");
        }
        if config.batch_size == 0 {
            anyhow::bail!("BATCH_SIZE must be at least 1");
        }
        if !(config.analytics.anomaly_threshold.is_finite()
            && config.analytics.anomaly_threshold > 0.0)
        {
            anyhow::bail!("ANOMALY_THRESHOLD must be a positive number");
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        _ => Ok(default),
    }
}

/// Platform API credentials. A platform without credentials is skipped.
#[derive(Clone, Default)]
pub struct Credentials {
    pub twitter_bearer_token: Option<String>,
    pub facebook_access_token: Option<String>,
    pub youtube_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("twitter", &self.twitter_bearer_token.is_some())
            .field("facebook", &self.facebook_access_token.is_some())
            .field("youtube", &self.youtube_api_key.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            twitter_bearer_token: non_empty("TWITTER_BEARER_TOKEN"),
            facebook_access_token: non_empty("FACEBOOK_ACCESS_TOKEN"),
            youtube_api_key: non_empty("YOUTUBE_API_KEY"),
        }
    }

    /// Platforms with credentials present, in canonical order.
    pub fn configured_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| match p {
                Platform::Twitter => self.twitter_bearer_token.is_some(),
                Platform::Facebook => self.facebook_access_token.is_some(),
                Platform::Youtube => self.youtube_api_key.is_some(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.analytics.moving_average_windows, vec![7, 30]);
    }

    #[test]
    fn test_overrides_from_env() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("MAX_RETRIES", "5"),
            ("RETRY_DELAY", "1"),
            ("ANOMALY_THRESHOLD", "3.5"),
            ("OUTPUT_DIR", "/tmp/out"),
        ]))
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.analytics.anomaly_threshold, 3.5);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_unparsable_value_is_error() {
        let err = PipelineConfig::from_lookup(lookup(&[("BATCH_SIZE", "lots")])).unwrap_err();
        assert!(err.to_string().contains("BATCH_SIZE"));
    }

    #[test]
    fn test_zero_retry_budget_rejected() {
        assert!(PipelineConfig::from_lookup(lookup(&[("MAX_RETRIES", "0")])).is_err());
    }

    #[test]
    fn test_configured_platforms() {
        let creds = Credentials::from_lookup(lookup(&[
            ("TWITTER_BEARER_TOKEN", "t"),
            ("FACEBOOK_ACCESS_TOKEN", " "),
            ("YOUTUBE_API_KEY", "y"),
        ]));
        assert_eq!(
            creds.configured_platforms(),
            vec![Platform::Twitter, Platform::Youtube]
        );
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials::from_lookup(lookup(&[("TWITTER_BEARER_TOKEN", "secret")]));
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
