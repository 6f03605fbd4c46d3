//! Per-post engagement target and the date it was first met.

use chrono::NaiveDate;
use engagedb_core::{PostRecord, RegressionPolicy};

use crate::error::{EngineError, ValidationError};
use crate::store::EngagementStore;

/// Target state of one post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetState {
    NoTarget,
    Unachieved { target: f64 },
    Achieved { target: f64, since: NaiveDate },
}

impl TargetState {
    /// Rebuild the state from stored fields. A missing or non-positive target
    /// means no target, whatever the achieved date says.
    #[must_use]
    pub fn from_fields(target: Option<f64>, achieved: Option<NaiveDate>) -> Self {
        match (target.filter(|t| *t > 0.0), achieved) {
            (None, _) => TargetState::NoTarget,
            (Some(target), None) => TargetState::Unachieved { target },
            (Some(target), Some(since)) => TargetState::Achieved { target, since },
        }
    }

    #[must_use]
    pub fn of(post: &PostRecord) -> Self {
        Self::from_fields(post.target_engagement, post.target_achieved_date)
    }

    #[must_use]
    pub fn target(self) -> Option<f64> {
        match self {
            TargetState::NoTarget => None,
            TargetState::Unachieved { target } | TargetState::Achieved { target, .. } => {
                Some(target)
            }
        }
    }

    #[must_use]
    pub fn achieved_date(self) -> Option<NaiveDate> {
        match self {
            TargetState::Achieved { since, .. } => Some(since),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveTarget`] unless `target` is
    /// finite and positive, or [`ValidationError::TargetAlreadySet`] when a
    /// target exists.
    pub fn set_target(self, target: f64) -> Result<Self, ValidationError> {
        if !(target.is_finite() && target > 0.0) {
            return Err(ValidationError::NonPositiveTarget(target));
        }
        if let Some(current) = self.target() {
            return Err(ValidationError::TargetAlreadySet { current });
        }
        Ok(TargetState::Unachieved { target })
    }

    #[must_use]
    pub fn reset(self) -> Self {
        TargetState::NoTarget
    }

    /// Fold a freshly computed rate into the state.
    ///
    /// Reaching the target (`rate >= target`) stamps `today` once; later
    /// achieving computations keep the original date.
    #[must_use]
    pub fn observe(self, rate: f64, today: NaiveDate, policy: RegressionPolicy) -> Self {
        match self {
            TargetState::NoTarget => self,
            TargetState::Unachieved { target } => {
                if rate >= target {
                    TargetState::Achieved {
                        target,
                        since: today,
                    }
                } else {
                    self
                }
            }
            TargetState::Achieved { target, .. } => {
                if rate < target && policy == RegressionPolicy::Clear {
                    TargetState::Unachieved { target }
                } else {
                    self
                }
            }
        }
    }
}

/// Set a target on a post that has none.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for a bad id, a missing post, a
/// non-positive target or an existing target, and [`EngineError::Storage`]
/// if the store fails.
pub async fn set_target<S: EngagementStore>(
    store: &S,
    post_id: i64,
    target: f64,
) -> Result<TargetState, EngineError> {
    let post = load_post(store, post_id).await?;
    let state = TargetState::of(&post).set_target(target)?;
    store
        .persist_target(post_id, state.target(), state.achieved_date())
        .await?;
    tracing::info!(post_id, target, "engagement target set");
    Ok(state)
}

/// Clear both target fields unconditionally.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for a bad id or a missing post and
/// [`EngineError::Storage`] if the store fails.
pub async fn reset_target<S: EngagementStore>(
    store: &S,
    post_id: i64,
) -> Result<TargetState, EngineError> {
    let post = load_post(store, post_id).await?;
    let state = TargetState::of(&post).reset();
    store.persist_target(post_id, None, None).await?;
    tracing::info!(post_id, "engagement target reset");
    Ok(state)
}

async fn load_post<S: EngagementStore>(store: &S, post_id: i64) -> Result<PostRecord, EngineError> {
    if post_id <= 0 {
        return Err(ValidationError::InvalidPostId(post_id).into());
    }
    store
        .get_post(post_id)
        .await?
        .ok_or_else(|| ValidationError::PostNotFound(post_id).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn set_target_requires_positive_finite_value() {
        let state = TargetState::NoTarget;
        assert_eq!(
            state.set_target(0.0),
            Err(ValidationError::NonPositiveTarget(0.0))
        );
        assert!(state.set_target(-2.5).is_err());
        assert!(state.set_target(f64::NAN).is_err());
        assert!(state.set_target(f64::INFINITY).is_err());
        assert_eq!(
            state.set_target(5.0),
            Ok(TargetState::Unachieved { target: 5.0 })
        );
    }

    #[test]
    fn existing_target_must_be_reset_first() {
        let state = TargetState::Unachieved { target: 5.0 };
        assert_eq!(
            state.set_target(8.0),
            Err(ValidationError::TargetAlreadySet { current: 5.0 })
        );
        assert_eq!(state.reset().set_target(8.0), Ok(TargetState::Unachieved { target: 8.0 }));
    }

    #[test]
    fn equal_rate_counts_as_achieved() {
        let state = TargetState::Unachieved { target: 5.0 };
        let next = state.observe(5.0, date(2024, 3, 1), RegressionPolicy::Sticky);
        assert_eq!(next.achieved_date(), Some(date(2024, 3, 1)));

        let below = state.observe(4.999_999, date(2024, 3, 1), RegressionPolicy::Sticky);
        assert_eq!(below, state);
    }

    #[test]
    fn achieved_date_is_not_moved_by_later_achievements() {
        let first = TargetState::Unachieved { target: 5.0 }.observe(
            6.0,
            date(2024, 3, 1),
            RegressionPolicy::Sticky,
        );
        let later = first.observe(9.0, date(2024, 3, 9), RegressionPolicy::Sticky);
        assert_eq!(later.achieved_date(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn regression_policy_decides_what_a_drop_does() {
        let achieved = TargetState::Achieved {
            target: 5.0,
            since: date(2024, 3, 1),
        };
        assert_eq!(
            achieved.observe(1.0, date(2024, 3, 5), RegressionPolicy::Sticky),
            achieved
        );
        assert_eq!(
            achieved.observe(1.0, date(2024, 3, 5), RegressionPolicy::Clear),
            TargetState::Unachieved { target: 5.0 }
        );
    }

    #[test]
    fn from_fields_ignores_date_without_target() {
        assert_eq!(
            TargetState::from_fields(None, Some(date(2024, 1, 1))),
            TargetState::NoTarget
        );
        assert_eq!(
            TargetState::from_fields(Some(0.0), None),
            TargetState::NoTarget
        );
    }

    #[test]
    fn no_target_never_achieves() {
        let state = TargetState::NoTarget.observe(1e9, date(2024, 1, 1), RegressionPolicy::Sticky);
        assert_eq!(state, TargetState::NoTarget);
    }
}
