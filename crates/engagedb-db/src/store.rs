//! [`EngagementStore`] backed by the Postgres pool.

use chrono::NaiveDate;
use engagedb_core::{DateRange, FollowerSample, FormulaSetting, Platform, PostMetrics, PostRecord};
use engagedb_engine::{EngagementStore, PostFilter, StorageError};
use sqlx::PgPool;

use crate::{followers, formulas, posts, DbError};

impl From<DbError> for StorageError {
    fn from(error: DbError) -> Self {
        StorageError::new(error)
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl EngagementStore for PgStore {
    async fn fetch_posts(&self, filter: &PostFilter) -> Result<Vec<PostRecord>, StorageError> {
        let rows = posts::list_posts(&self.pool, filter.platform, filter.range).await?;
        Ok(rows
            .into_iter()
            .map(posts::PostRow::into_record)
            .collect::<Result<_, _>>()?)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<PostRecord>, StorageError> {
        let row = posts::get_post(&self.pool, post_id).await?;
        Ok(row.map(posts::PostRow::into_record).transpose()?)
    }

    async fn follower_samples(
        &self,
        platform: Option<Platform>,
        range: Option<DateRange>,
    ) -> Result<Vec<FollowerSample>, StorageError> {
        let rows = followers::list_follower_samples(&self.pool, platform, range).await?;
        Ok(rows
            .into_iter()
            .map(followers::FollowerSampleRow::into_sample)
            .collect::<Result<_, _>>()?)
    }

    async fn latest_follower_sample(
        &self,
        platform: Platform,
        on_or_before: NaiveDate,
    ) -> Result<Option<FollowerSample>, StorageError> {
        let row = followers::latest_follower_sample(&self.pool, platform, on_or_before).await?;
        Ok(row
            .map(followers::FollowerSampleRow::into_sample)
            .transpose()?)
    }

    async fn record_follower_sample(&self, sample: FollowerSample) -> Result<(), StorageError> {
        followers::upsert_follower_sample(
            &self.pool,
            sample.platform,
            sample.follower_count,
            sample.recorded_date,
        )
        .await?;
        Ok(())
    }

    async fn active_formula(&self) -> Result<Option<FormulaSetting>, StorageError> {
        let row = formulas::get_active_formula(&self.pool).await?;
        Ok(row.map(FormulaSetting::from))
    }

    async fn formula_history(&self) -> Result<Vec<FormulaSetting>, StorageError> {
        let rows = formulas::list_formula_history(&self.pool).await?;
        Ok(rows.into_iter().map(FormulaSetting::from).collect())
    }

    async fn persist_formula(&self, name: &str, text: &str) -> Result<FormulaSetting, StorageError> {
        let row = formulas::insert_and_activate_formula(&self.pool, name, text).await?;
        Ok(row.into())
    }

    async fn apply_metric_update(
        &self,
        post_id: i64,
        metrics: &PostMetrics,
    ) -> Result<Option<PostRecord>, StorageError> {
        let row = posts::update_post_metrics(&self.pool, post_id, metrics).await?;
        Ok(row.map(posts::PostRow::into_record).transpose()?)
    }

    async fn persist_target(
        &self,
        post_id: i64,
        target: Option<f64>,
        achieved_date: Option<NaiveDate>,
    ) -> Result<(), StorageError> {
        posts::set_post_target(&self.pool, post_id, target, achieved_date).await?;
        Ok(())
    }

    async fn persist_target_achieved_date(
        &self,
        post_id: i64,
        achieved_date: Option<NaiveDate>,
    ) -> Result<(), StorageError> {
        posts::set_target_achieved_date(&self.pool, post_id, achieved_date).await?;
        Ok(())
    }
}
