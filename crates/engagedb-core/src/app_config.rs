use chrono::FixedOffset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What happens to an already-achieved target when a later recomputation
/// falls back below it.
///
/// `Sticky` keeps the first achievement date until the target is explicitly
/// reset. `Clear` drops the date so the post reads as unachieved again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegressionPolicy {
    #[default]
    Sticky,
    Clear,
}

impl std::fmt::Display for RegressionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegressionPolicy::Sticky => write!(f, "sticky"),
            RegressionPolicy::Clear => write!(f, "clear"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Days after `post_date` during which a post is still "running".
    pub running_window_days: u32,
    pub target_regression: RegressionPolicy,
    pub max_comparison_months: u32,
    /// Offset used to decide what "today" is for status and achievement dates.
    pub utc_offset: FixedOffset,
}

impl AppConfig {
    /// The current calendar date in the configured offset.
    #[must_use]
    pub fn today(&self) -> chrono::NaiveDate {
        crate::dates::today_in(self.utc_offset)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("running_window_days", &self.running_window_days)
            .field("target_regression", &self.target_regression)
            .field("max_comparison_months", &self.max_comparison_months)
            .field("utc_offset", &self.utc_offset)
            .finish()
    }
}
