pub mod analyzers;
pub mod collect;
pub mod config;
pub mod engagement;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod sink;
pub mod sources;
