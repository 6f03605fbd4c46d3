//! Batch metric updates with per-post target recomputation.

use chrono::NaiveDate;
use engagedb_core::{FollowerSample, RegressionPolicy};

use crate::calculator::{EngagementCalculator, RateSession};
use crate::error::{EngineError, ValidationError};
use crate::store::{EngagementStore, MetricUpdate};
use crate::tracker::TargetState;

#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    /// Date stamped on follower samples and newly achieved targets.
    pub today: NaiveDate,
    pub regression: RegressionPolicy,
}

/// One rejected row of a batch.
#[derive(Debug)]
pub struct BatchItemError {
    pub post_id: i64,
    pub error: EngineError,
}

impl std::fmt::Display for BatchItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "post {}: {}", self.post_id, self.error)
    }
}

/// Outcome of [`apply_metric_updates`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Rows written.
    pub updated: usize,
    /// Rows with no values at all.
    pub skipped: usize,
    /// Written rows whose engagement rate was recomputed against a target.
    pub recomputed: usize,
    pub errors: Vec<BatchItemError>,
}

impl BatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Apply each update in order.
///
/// A failing row is recorded in [`BatchReport::errors`] and never stops the
/// rest of the batch. A row only triggers target recomputation when it
/// supplies every post counter the formula reads.
pub async fn apply_metric_updates<S: EngagementStore>(
    store: &S,
    calculator: &EngagementCalculator,
    updates: &[MetricUpdate],
    options: UpdateOptions,
) -> BatchReport {
    let mut report = BatchReport::default();
    let mut session = calculator.session(store);

    for update in updates {
        if update.is_blank() {
            tracing::debug!(post_id = update.post_id, "skipping blank metric update");
            report.skipped += 1;
            continue;
        }

        match apply_one(store, calculator, &mut session, update, options).await {
            Ok(recomputed) => {
                report.updated += 1;
                if recomputed {
                    report.recomputed += 1;
                }
            }
            Err(error) => {
                tracing::warn!(post_id = update.post_id, error = %error, "metric update failed");
                report.errors.push(BatchItemError {
                    post_id: update.post_id,
                    error,
                });
            }
        }
    }

    tracing::info!(
        updated = report.updated,
        skipped = report.skipped,
        recomputed = report.recomputed,
        errors = report.errors.len(),
        "metric update batch finished"
    );
    report
}

async fn apply_one<S: EngagementStore>(
    store: &S,
    calculator: &EngagementCalculator,
    session: &mut RateSession<'_, S>,
    update: &MetricUpdate,
    options: UpdateOptions,
) -> Result<bool, EngineError> {
    update.validate()?;

    let post = store
        .apply_metric_update(update.post_id, &update.metrics)
        .await?
        .ok_or(ValidationError::PostNotFound(update.post_id))?;

    if let Some(count) = update.follower {
        store
            .record_follower_sample(FollowerSample {
                platform: post.platform,
                follower_count: count,
                recorded_date: options.today,
            })
            .await?;
        session.prime_follower(post.platform, options.today, count);
    }

    let state = TargetState::of(&post);
    if state == TargetState::NoTarget {
        return Ok(false);
    }
    let complete = calculator
        .required_post_metrics()
        .is_some_and(|required| update.supplies_all(&required));
    if !complete {
        tracing::debug!(post_id = post.id, "partial update; target not recomputed");
        return Ok(false);
    }

    let rate = session.rate(&post, options.today).await?;
    let next = state.observe(rate, options.today, options.regression);
    if next.achieved_date() != state.achieved_date() {
        store
            .persist_target_achieved_date(post.id, next.achieved_date())
            .await?;
        match next.achieved_date() {
            Some(date) => tracing::info!(post_id = post.id, rate, %date, "engagement target achieved"),
            None => tracing::info!(post_id = post.id, rate, "engagement target no longer met"),
        }
    }
    Ok(true)
}
