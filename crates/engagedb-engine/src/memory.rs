//! In-process [`EngagementStore`] used by tests and offline tooling.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use engagedb_core::{
    DateRange, FollowerSample, FormulaSetting, Platform, PostMetrics, PostRecord, YearMonth,
};
use uuid::Uuid;

use crate::error::StorageError;
use crate::store::{EngagementStore, PostFilter};

#[derive(Debug, Default)]
struct State {
    posts: BTreeMap<i64, PostRecord>,
    followers: Vec<FollowerSample>,
    formulas: Vec<FormulaSetting>,
    active_formula: Option<i64>,
    next_post_id: i64,
}

/// A mutex-guarded store holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::message("memory store lock poisoned"))
    }

    /// Insert a post and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only if the internal lock is poisoned.
    pub fn insert_post(
        &self,
        platform: Platform,
        title: &str,
        post_date: NaiveDate,
        metrics: PostMetrics,
    ) -> Result<PostRecord, StorageError> {
        let mut state = self.lock()?;
        state.next_post_id += 1;
        let post = PostRecord {
            id: state.next_post_id,
            public_id: Uuid::new_v4(),
            platform,
            title: title.to_string(),
            post_url: None,
            post_date,
            report_date: post_date,
            metrics,
            target_engagement: None,
            target_achieved_date: None,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }
}

impl EngagementStore for MemoryStore {
    async fn fetch_posts(&self, filter: &PostFilter) -> Result<Vec<PostRecord>, StorageError> {
        let state = self.lock()?;
        let mut posts: Vec<PostRecord> = state
            .posts
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        posts.sort_by_key(|p| (p.post_date, p.id));
        Ok(posts)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<PostRecord>, StorageError> {
        Ok(self.lock()?.posts.get(&post_id).cloned())
    }

    async fn follower_samples(
        &self,
        platform: Option<Platform>,
        range: Option<DateRange>,
    ) -> Result<Vec<FollowerSample>, StorageError> {
        let state = self.lock()?;
        let mut samples: Vec<FollowerSample> = state
            .followers
            .iter()
            .filter(|s| platform.is_none_or(|p| p == s.platform))
            .filter(|s| range.is_none_or(|r| r.contains(s.recorded_date)))
            .copied()
            .collect();
        samples.sort_by_key(|s| (s.recorded_date, s.platform));
        Ok(samples)
    }

    async fn latest_follower_sample(
        &self,
        platform: Platform,
        on_or_before: NaiveDate,
    ) -> Result<Option<FollowerSample>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .followers
            .iter()
            .filter(|s| s.platform == platform && s.recorded_date <= on_or_before)
            .max_by_key(|s| s.recorded_date)
            .copied())
    }

    async fn record_follower_sample(&self, sample: FollowerSample) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let month = YearMonth::of(sample.recorded_date);
        state
            .followers
            .retain(|s| !(s.platform == sample.platform && YearMonth::of(s.recorded_date) == month));
        state.followers.push(sample);
        Ok(())
    }

    async fn active_formula(&self) -> Result<Option<FormulaSetting>, StorageError> {
        let state = self.lock()?;
        Ok(state.active_formula.and_then(|id| {
            state
                .formulas
                .iter()
                .find(|f| f.id == id)
                .map(|f| FormulaSetting {
                    is_active: true,
                    ..f.clone()
                })
        }))
    }

    async fn formula_history(&self) -> Result<Vec<FormulaSetting>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .formulas
            .iter()
            .rev()
            .map(|f| FormulaSetting {
                is_active: state.active_formula == Some(f.id),
                ..f.clone()
            })
            .collect())
    }

    async fn persist_formula(&self, name: &str, text: &str) -> Result<FormulaSetting, StorageError> {
        let mut state = self.lock()?;
        let id = i64::try_from(state.formulas.len()).unwrap_or(i64::MAX - 1) + 1;
        let setting = FormulaSetting {
            id,
            name: name.to_string(),
            engagement_formula: text.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        state.formulas.push(FormulaSetting {
            is_active: false,
            ..setting.clone()
        });
        state.active_formula = Some(id);
        Ok(setting)
    }

    async fn apply_metric_update(
        &self,
        post_id: i64,
        metrics: &PostMetrics,
    ) -> Result<Option<PostRecord>, StorageError> {
        let mut state = self.lock()?;
        Ok(state.posts.get_mut(&post_id).map(|post| {
            post.metrics = post.metrics.merged_with(metrics);
            post.clone()
        }))
    }

    async fn persist_target(
        &self,
        post_id: i64,
        target: Option<f64>,
        achieved_date: Option<NaiveDate>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| StorageError::message(format!("post {post_id} not found")))?;
        post.target_engagement = target;
        post.target_achieved_date = achieved_date;
        Ok(())
    }

    async fn persist_target_achieved_date(
        &self,
        post_id: i64,
        achieved_date: Option<NaiveDate>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| StorageError::message(format!("post {post_id} not found")))?;
        post.target_achieved_date = achieved_date;
        Ok(())
    }
}
