//! Shared domain types and configuration for engagedb.
//!
//! Everything here is plain data: posts, follower samples, formula settings,
//! calendar helpers and the environment-driven [`AppConfig`]. The analytics
//! engine and the storage crate both build on these types.

mod app_config;
mod config;
pub mod dates;
pub mod metrics;
pub mod platform;
pub mod posts;

pub use app_config::{AppConfig, Environment, RegressionPolicy};
pub use config::{load_app_config, load_app_config_from_env};
pub use dates::{format_display_date, DateRange, YearMonth};
pub use metrics::Metric;
pub use platform::Platform;
pub use posts::{
    dedupe_title, derive_status, FollowerSample, FormulaSetting, PostMetrics, PostRecord,
    PostStatus,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    #[error("invalid month '{0}'; expected YYYY-MM")]
    InvalidMonth(String),
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}
