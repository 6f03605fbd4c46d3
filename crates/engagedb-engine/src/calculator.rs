//! Engagement rate per post: metric resolution followed by formula evaluation.

use chrono::NaiveDate;
use engagedb_core::{Metric, Platform, PostRecord};
use serde::Serialize;

use crate::error::{FormulaError, StorageError};
use crate::formula::{Formula, MetricBindings};
use crate::formula_store;
use crate::resolver::MetricResolver;
use crate::store::EngagementStore;

/// Per-post output of the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostEngagement {
    pub engagement_rate: f64,
    pub total_engagements: i64,
}

/// Holds the formula in force for one request.
///
/// A formula that fails to parse is kept alongside its error: every rate
/// computed with it is `0.0` and a warning is logged, so a broken active
/// formula degrades analytics instead of failing them.
#[derive(Debug, Clone)]
pub struct EngagementCalculator {
    text: String,
    parsed: Result<Formula, FormulaError>,
}

impl EngagementCalculator {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let parsed = Formula::parse(text);
        if let Err(ref error) = parsed {
            tracing::warn!(formula = text, error = %error, "engagement formula does not parse; rates will be 0");
        }
        Self {
            text: text.to_string(),
            parsed,
        }
    }

    #[must_use]
    pub fn with_formula(formula: Formula) -> Self {
        Self {
            text: formula.source().to_string(),
            parsed: Ok(formula),
        }
    }

    #[must_use]
    pub fn default_formula() -> Self {
        Self::with_formula(Formula::default_formula())
    }

    /// Build a calculator from the store's active formula, falling back to
    /// the default when none is active.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the formula cannot be read.
    pub async fn load<S: EngagementStore>(store: &S) -> Result<Self, StorageError> {
        let active = formula_store::active_formula(store).await?;
        if active.is_default() {
            return Ok(Self::default_formula());
        }
        Ok(Self::new(active.text()))
    }

    #[must_use]
    pub fn formula_text(&self) -> &str {
        &self.text
    }

    /// The parsed formula, or `None` if the text did not parse.
    #[must_use]
    pub fn formula(&self) -> Option<&Formula> {
        self.parsed.as_ref().ok()
    }

    #[must_use]
    pub fn parse_error(&self) -> Option<&FormulaError> {
        self.parsed.as_ref().err()
    }

    #[must_use]
    pub fn needs_follower(&self) -> bool {
        self.formula()
            .is_some_and(|f| f.references(Metric::Follower))
    }

    /// Post counters the formula reads. `None` when the formula did not parse,
    /// since then no update can be complete enough to recompute a rate.
    #[must_use]
    pub fn required_post_metrics(&self) -> Option<Vec<Metric>> {
        self.formula().map(|f| {
            f.metrics()
                .iter()
                .copied()
                .filter(|m| m.is_post_metric())
                .collect()
        })
    }

    #[must_use]
    pub fn rate_from_bindings(&self, bindings: &MetricBindings) -> f64 {
        match &self.parsed {
            Ok(formula) => formula.evaluate(bindings),
            Err(error) => {
                tracing::warn!(formula = %self.text, error = %error, "skipping evaluation of unparseable formula");
                0.0
            }
        }
    }

    /// Start a session that shares follower lookups across many posts.
    pub fn session<'a, S: EngagementStore>(&'a self, store: &'a S) -> RateSession<'a, S> {
        RateSession {
            calculator: self,
            resolver: MetricResolver::new(store, self.needs_follower()),
        }
    }

    /// Rate for a single post with follower counts as of `reference_date`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the follower lookup fails.
    pub async fn compute_rate<S: EngagementStore>(
        &self,
        store: &S,
        post: &PostRecord,
        reference_date: NaiveDate,
    ) -> Result<f64, StorageError> {
        self.session(store).rate(post, reference_date).await
    }

    /// # Errors
    ///
    /// Returns [`StorageError`] if the follower lookup fails.
    pub async fn engagement<S: EngagementStore>(
        &self,
        store: &S,
        post: &PostRecord,
        reference_date: NaiveDate,
    ) -> Result<PostEngagement, StorageError> {
        self.session(store).engagement(post, reference_date).await
    }

    /// `like + comment + share + save`, independent of the formula.
    #[must_use]
    pub fn total_engagements(post: &PostRecord) -> i64 {
        post.metrics.total_engagements()
    }
}

/// A calculator bound to a store with a shared follower cache.
pub struct RateSession<'a, S> {
    calculator: &'a EngagementCalculator,
    resolver: MetricResolver<'a, S>,
}

impl<S: EngagementStore> RateSession<'_, S> {
    /// # Errors
    ///
    /// Returns [`StorageError`] if the follower lookup fails.
    pub async fn rate(
        &mut self,
        post: &PostRecord,
        reference_date: NaiveDate,
    ) -> Result<f64, StorageError> {
        if self.calculator.formula().is_none() {
            return Ok(self.calculator.rate_from_bindings(&MetricBindings::default()));
        }
        let bindings = self.resolver.resolve(post, reference_date).await?;
        Ok(self.calculator.rate_from_bindings(&bindings))
    }

    /// # Errors
    ///
    /// Returns [`StorageError`] if the follower lookup fails.
    pub async fn engagement(
        &mut self,
        post: &PostRecord,
        reference_date: NaiveDate,
    ) -> Result<PostEngagement, StorageError> {
        Ok(PostEngagement {
            engagement_rate: self.rate(post, reference_date).await?,
            total_engagements: EngagementCalculator::total_engagements(post),
        })
    }

    /// Tell the session about a follower count written during this session.
    pub fn prime_follower(&mut self, platform: Platform, reference_date: NaiveDate, count: i64) {
        self.resolver.prime(platform, reference_date, count);
    }
}
