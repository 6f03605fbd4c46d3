//! Database operations for `follower_samples`.

use chrono::{DateTime, NaiveDate, Utc};
use engagedb_core::{DateRange, FollowerSample, Platform};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `follower_samples` table.
///
/// The generated `sample_month` column is not selected; it exists only to
/// enforce one sample per platform and month.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowerSampleRow {
    pub id: i64,
    pub platform: String,
    pub follower_count: i64,
    pub recorded_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl FollowerSampleRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored platform is not recognised.
    pub fn into_sample(self) -> Result<FollowerSample, DbError> {
        let platform: Platform = self.platform.parse().map_err(|_| DbError::InvalidColumn {
            column: "follower_samples.platform",
            value: self.platform.clone(),
        })?;
        Ok(FollowerSample {
            platform,
            follower_count: self.follower_count,
            recorded_date: self.recorded_date,
        })
    }
}

/// Records a follower count, replacing any sample already stored for the same
/// platform and calendar month.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_follower_sample(
    pool: &PgPool,
    platform: Platform,
    follower_count: i64,
    recorded_date: NaiveDate,
) -> Result<FollowerSampleRow, DbError> {
    let row = sqlx::query_as::<_, FollowerSampleRow>(
        "INSERT INTO follower_samples (platform, follower_count, recorded_date) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (platform, sample_month) DO UPDATE SET \
             follower_count = EXCLUDED.follower_count, \
             recorded_date = EXCLUDED.recorded_date \
         RETURNING id, platform, follower_count, recorded_date, created_at",
    )
    .bind(platform.as_str())
    .bind(follower_count)
    .bind(recorded_date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Samples matching an optional platform and inclusive date range, ordered by
/// `recorded_date`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_follower_samples(
    pool: &PgPool,
    platform: Option<Platform>,
    range: Option<DateRange>,
) -> Result<Vec<FollowerSampleRow>, DbError> {
    let rows = sqlx::query_as::<_, FollowerSampleRow>(
        "SELECT id, platform, follower_count, recorded_date, created_at \
         FROM follower_samples \
         WHERE ($1::text IS NULL OR platform = $1) \
           AND ($2::date IS NULL OR recorded_date >= $2) \
           AND ($3::date IS NULL OR recorded_date <= $3) \
         ORDER BY recorded_date, platform",
    )
    .bind(platform.map(Platform::as_str))
    .bind(range.and_then(|r| r.lower_bound()))
    .bind(range.map(|r| r.end()))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The most recent sample for `platform` recorded on or before `on_or_before`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_follower_sample(
    pool: &PgPool,
    platform: Platform,
    on_or_before: NaiveDate,
) -> Result<Option<FollowerSampleRow>, DbError> {
    let row = sqlx::query_as::<_, FollowerSampleRow>(
        "SELECT id, platform, follower_count, recorded_date, created_at \
         FROM follower_samples \
         WHERE platform = $1 AND recorded_date <= $2 \
         ORDER BY recorded_date DESC \
         LIMIT 1",
    )
    .bind(platform.as_str())
    .bind(on_or_before)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
