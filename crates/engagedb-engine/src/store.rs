//! The storage collaborator the engine reads from and writes derived values to.

use std::future::Future;

use chrono::NaiveDate;
use engagedb_core::{
    DateRange, FollowerSample, FormulaSetting, Metric, Platform, PostMetrics, PostRecord,
};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, ValidationError};

/// Platform/date predicate applied by the store when listing posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub platform: Option<Platform>,
    pub range: Option<DateRange>,
}

impl PostFilter {
    #[must_use]
    pub fn new(platform: Option<Platform>, range: Option<DateRange>) -> Self {
        Self { platform, range }
    }

    #[must_use]
    pub fn matches(&self, post: &PostRecord) -> bool {
        self.platform.is_none_or(|p| p == post.platform)
            && self.range.is_none_or(|r| r.contains(post.post_date))
    }
}

/// One row of a metric update batch.
///
/// Blank counters leave the stored value untouched. `follower`, when present,
/// is recorded as the post platform's follower sample for the update date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricUpdate {
    pub post_id: i64,
    #[serde(flatten)]
    pub metrics: PostMetrics,
    #[serde(default)]
    pub follower: Option<i64>,
}

impl MetricUpdate {
    /// `true` when the row carries no values at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.metrics.is_empty() && self.follower.is_none()
    }

    /// Reject ids that cannot exist and negative counts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPostId`] or
    /// [`ValidationError::NegativeMetric`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.post_id <= 0 {
            return Err(ValidationError::InvalidPostId(self.post_id));
        }
        if let Some(metric) = self.metrics.first_negative() {
            return Err(ValidationError::NegativeMetric {
                metric,
                value: self.metrics.get(metric).unwrap_or_default(),
            });
        }
        if let Some(value) = self.follower.filter(|v| *v < 0) {
            return Err(ValidationError::NegativeMetric {
                metric: Metric::Follower,
                value,
            });
        }
        Ok(())
    }

    /// `true` when every post counter in `required` was supplied.
    #[must_use]
    pub fn supplies_all(&self, required: &[Metric]) -> bool {
        required
            .iter()
            .filter(|m| m.is_post_metric())
            .all(|m| self.metrics.get(*m).is_some())
    }
}

/// Reads and writes the engine needs from persistence.
///
/// Implementations own all I/O; the engine never retries a failed call.
/// Posts come back ordered by `post_date`, then `id`; follower samples by
/// `recorded_date`.
pub trait EngagementStore: Sync {
    fn fetch_posts(
        &self,
        filter: &PostFilter,
    ) -> impl Future<Output = Result<Vec<PostRecord>, StorageError>> + Send;

    fn get_post(
        &self,
        post_id: i64,
    ) -> impl Future<Output = Result<Option<PostRecord>, StorageError>> + Send;

    fn follower_samples(
        &self,
        platform: Option<Platform>,
        range: Option<DateRange>,
    ) -> impl Future<Output = Result<Vec<FollowerSample>, StorageError>> + Send;

    /// Most recent sample for `platform` recorded on or before `on_or_before`.
    fn latest_follower_sample(
        &self,
        platform: Platform,
        on_or_before: NaiveDate,
    ) -> impl Future<Output = Result<Option<FollowerSample>, StorageError>> + Send;

    /// Store a sample, replacing any earlier sample for the same platform and month.
    fn record_follower_sample(
        &self,
        sample: FollowerSample,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn active_formula(
        &self,
    ) -> impl Future<Output = Result<Option<FormulaSetting>, StorageError>> + Send;

    /// All saved formulas, newest first.
    fn formula_history(
        &self,
    ) -> impl Future<Output = Result<Vec<FormulaSetting>, StorageError>> + Send;

    /// Append a formula and make it the active one in a single atomic step.
    fn persist_formula(
        &self,
        name: &str,
        text: &str,
    ) -> impl Future<Output = Result<FormulaSetting, StorageError>> + Send;

    /// Overlay the supplied counters on the post and return the updated
    /// record, or `None` if the post does not exist.
    fn apply_metric_update(
        &self,
        post_id: i64,
        metrics: &PostMetrics,
    ) -> impl Future<Output = Result<Option<PostRecord>, StorageError>> + Send;

    /// Write both target fields together.
    fn persist_target(
        &self,
        post_id: i64,
        target: Option<f64>,
        achieved_date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn persist_target_achieved_date(
        &self,
        post_id: i64,
        achieved_date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
