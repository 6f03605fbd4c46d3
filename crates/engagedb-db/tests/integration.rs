//! Offline unit tests for engagedb-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::{FixedOffset, NaiveDate, Utc};
use engagedb_core::{AppConfig, Environment, FormulaSetting, Platform, RegressionPolicy};
use engagedb_db::{DbError, FollowerSampleRow, FormulaSettingRow, PoolConfig, PostRow};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn post_row(platform: &str) -> PostRow {
    PostRow {
        id: 12,
        public_id: Uuid::new_v4(),
        platform: platform.to_string(),
        title: "Spring launch".to_string(),
        post_url: Some("https://example.com/p/12".to_string()),
        post_date: date(2024, 4, 2),
        report_date: date(2024, 4, 3),
        view_count: Some(1_000),
        like_count: Some(40),
        comment_count: None,
        share_count: Some(3),
        save_count: None,
        target_engagement: Some(4.5),
        target_achieved_date: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        running_window_days: 30,
        target_regression: RegressionPolicy::Sticky,
        max_comparison_months: 24,
        utc_offset: FixedOffset::east_opt(7 * 3600).unwrap(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn post_row_converts_to_record() {
    let record = post_row("instagram").into_record().unwrap();

    assert_eq!(record.id, 12);
    assert_eq!(record.platform, Platform::Instagram);
    assert_eq!(record.metrics.view, Some(1_000));
    assert_eq!(record.metrics.comment, None);
    assert_eq!(record.metrics.total_engagements(), 43);
    assert_eq!(record.target_engagement, Some(4.5));
}

#[test]
fn post_row_with_unknown_platform_is_rejected() {
    let err = post_row("myspace").into_record().unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidColumn { column: "posts.platform", ref value } if value == "myspace"
    ));
}

#[test]
fn follower_row_converts_to_sample() {
    let row = FollowerSampleRow {
        id: 1,
        platform: "youtube".to_string(),
        follower_count: 12_500,
        recorded_date: date(2024, 5, 31),
        created_at: Utc::now(),
    };

    let sample = row.into_sample().unwrap();
    assert_eq!(sample.platform, Platform::Youtube);
    assert_eq!(sample.follower_count, 12_500);
    assert_eq!(sample.recorded_date, date(2024, 5, 31));
}

#[test]
fn formula_row_converts_to_setting() {
    let row = FormulaSettingRow {
        id: 3,
        name: "reach".to_string(),
        engagement_formula: "(like + comment) / follower * 100".to_string(),
        is_active: true,
        created_at: Utc::now(),
    };

    let setting = FormulaSetting::from(row);
    assert_eq!(setting.id, 3);
    assert!(setting.is_active);
    assert_eq!(setting.engagement_formula, "(like + comment) / follower * 100");
}
