//! Storage backends behind the run sinks.

pub mod s3;
pub mod sqlite;
