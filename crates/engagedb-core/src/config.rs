use chrono::FixedOffset;

use crate::app_config::{AppConfig, Environment, RegressionPolicy};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files, which suits tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("ENGAGEDB_ENV", "development"))?;
    let log_level = or_default("ENGAGEDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ENGAGEDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ENGAGEDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ENGAGEDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let running_window_days = parse_u32("ENGAGEDB_RUNNING_WINDOW_DAYS", "30")?;
    let target_regression =
        parse_regression_policy(&or_default("ENGAGEDB_TARGET_REGRESSION", "sticky"))?;
    let max_comparison_months = parse_u32("ENGAGEDB_MAX_COMPARISON_MONTHS", "24")?;
    let utc_offset = parse_utc_offset(&or_default("ENGAGEDB_UTC_OFFSET", "+07:00"))?;

    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "ENGAGEDB_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        running_window_days,
        target_regression,
        max_comparison_months,
        utc_offset,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ENGAGEDB_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_regression_policy(s: &str) -> Result<RegressionPolicy, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "sticky" => Ok(RegressionPolicy::Sticky),
        "clear" => Ok(RegressionPolicy::Clear),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ENGAGEDB_TARGET_REGRESSION".to_string(),
            reason: format!("expected sticky or clear; got '{other}'"),
        }),
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset such as the `+07:00` the reports run in.
///
/// `Z` and `+HHMM` are accepted too.
fn parse_utc_offset(s: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEnvVar {
        var: "ENGAGEDB_UTC_OFFSET".to_string(),
        reason: format!("{reason}: '{s}'"),
    };

    let raw = s.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid("offset out of range"));
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid("offset must start with + or -")),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected HH:MM"));
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid("bad hours"))?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid("bad minutes"))?;
    if hours > 23 || minutes > 59 {
        return Err(invalid("offset out of range"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| invalid("offset out of range"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
