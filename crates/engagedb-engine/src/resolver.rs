//! Gathers the metric values a formula needs for one post.

use std::collections::HashMap;

use chrono::NaiveDate;
use engagedb_core::{FollowerSample, Metric, Platform, PostRecord};

use crate::error::StorageError;
use crate::formula::MetricBindings;
use crate::store::EngagementStore;

/// The latest sample for `platform` recorded on or before `date`.
///
/// `samples` may be in any order and may mix platforms.
#[must_use]
pub fn latest_on_or_before(
    samples: &[FollowerSample],
    platform: Platform,
    date: NaiveDate,
) -> Option<&FollowerSample> {
    samples
        .iter()
        .filter(|s| s.platform == platform && s.recorded_date <= date)
        .max_by_key(|s| s.recorded_date)
}

/// Resolves post metrics into [`MetricBindings`].
///
/// Follower counts are only fetched when `needs_follower` is set, and each
/// `(platform, reference date)` pair is fetched at most once per resolver.
pub struct MetricResolver<'a, S> {
    store: &'a S,
    needs_follower: bool,
    followers: HashMap<(Platform, NaiveDate), f64>,
}

impl<'a, S: EngagementStore> MetricResolver<'a, S> {
    pub fn new(store: &'a S, needs_follower: bool) -> Self {
        Self {
            store,
            needs_follower,
            followers: HashMap::new(),
        }
    }

    /// Bind the post's stored counters plus, when needed, the platform's
    /// follower count as of `reference_date`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the follower lookup fails.
    pub async fn resolve(
        &mut self,
        post: &PostRecord,
        reference_date: NaiveDate,
    ) -> Result<MetricBindings, StorageError> {
        let mut bindings = MetricBindings::from_post_metrics(&post.metrics);
        if self.needs_follower {
            let followers = self.follower_count(post.platform, reference_date).await?;
            bindings.set(Metric::Follower, followers);
        }
        Ok(bindings)
    }

    /// Seed the cache with a follower count the caller just wrote.
    #[allow(clippy::cast_precision_loss)]
    pub fn prime(&mut self, platform: Platform, reference_date: NaiveDate, count: i64) {
        self.followers
            .insert((platform, reference_date), count as f64);
    }

    #[allow(clippy::cast_precision_loss)]
    async fn follower_count(
        &mut self,
        platform: Platform,
        reference_date: NaiveDate,
    ) -> Result<f64, StorageError> {
        if let Some(cached) = self.followers.get(&(platform, reference_date)) {
            return Ok(*cached);
        }

        let count = self
            .store
            .latest_follower_sample(platform, reference_date)
            .await?
            .map_or(0.0, |s| s.follower_count as f64);

        tracing::debug!(%platform, %reference_date, count, "resolved follower count");
        self.followers.insert((platform, reference_date), count);
        Ok(count)
    }
}
