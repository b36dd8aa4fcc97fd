//! Engagement analytics over a normalized batch of posts.
//!
//! Posts are bucketed by day and platform for daily metrics and trailing
//! moving averages, ranked once for the top-post lists, scanned for
//! engagement outliers, and compared across platforms. [`summary`] composes
//! all of it into one [`types::AnalyticsSummary`].

pub mod aggregate;
pub mod anomaly;
pub mod comparison;
pub mod moving_average;
pub mod ranking;
pub mod summary;
pub mod tier;
pub mod types;
pub mod utility;

pub use summary::build_summary;
pub use types::AnalyticsSummary;
