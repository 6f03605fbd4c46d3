//! Totals and period-over-period changes.
//!
//! Two modes share these building blocks: a single inclusive date range
//! ([`range_report`]) and a run of calendar months ending at a given month
//! ([`comparison_report`]).

mod compare;
mod range;

use std::collections::BTreeMap;

use engagedb_core::{Metric, PostMetrics};
use serde::Serialize;

pub use compare::{comparison_report, month_buckets, ComparisonReport, MonthBucket};
pub use range::{range_report, RangeReport};

/// Per-metric sums of the five post counters. Missing counts add nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricTotals {
    pub view: i64,
    pub like: i64,
    pub comment: i64,
    pub share: i64,
    pub save: i64,
}

impl MetricTotals {
    pub fn add(&mut self, metrics: &PostMetrics) {
        self.view = self.view.saturating_add(metrics.view.unwrap_or(0));
        self.like = self.like.saturating_add(metrics.like.unwrap_or(0));
        self.comment = self.comment.saturating_add(metrics.comment.unwrap_or(0));
        self.share = self.share.saturating_add(metrics.share.unwrap_or(0));
        self.save = self.save.saturating_add(metrics.save.unwrap_or(0));
    }

    pub fn merge(&mut self, other: &MetricTotals) {
        self.view = self.view.saturating_add(other.view);
        self.like = self.like.saturating_add(other.like);
        self.comment = self.comment.saturating_add(other.comment);
        self.share = self.share.saturating_add(other.share);
        self.save = self.save.saturating_add(other.save);
    }

    /// Total for a post metric; `0` for [`Metric::Follower`].
    #[must_use]
    pub fn get(&self, metric: Metric) -> i64 {
        match metric {
            Metric::View => self.view,
            Metric::Like => self.like,
            Metric::Comment => self.comment,
            Metric::Share => self.share,
            Metric::Save => self.save,
            Metric::Follower => 0,
        }
    }
}

impl<'a> FromIterator<&'a PostMetrics> for MetricTotals {
    fn from_iter<T: IntoIterator<Item = &'a PostMetrics>>(iter: T) -> Self {
        let mut totals = Self::default();
        for metrics in iter {
            totals.add(metrics);
        }
        totals
    }
}

/// Movement from a start value to an end value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Change {
    pub start: f64,
    pub end: f64,
    pub diff: f64,
    pub pct: f64,
}

impl Change {
    /// `pct` is `diff / start * 100` when `start > 0`. From a zero start it is
    /// `100` if anything appeared and `0` otherwise.
    #[must_use]
    pub fn between(start: f64, end: f64) -> Self {
        let diff = end - start;
        let pct = if start > 0.0 {
            diff / start * 100.0
        } else if end > 0.0 {
            100.0
        } else {
            0.0
        };
        Self {
            start,
            end,
            diff,
            pct,
        }
    }

    /// No movement: start and end both equal `value`.
    #[must_use]
    pub fn flat(value: f64) -> Self {
        Self::between(value, value)
    }
}

pub type MetricChanges = BTreeMap<Metric, Change>;

/// Arithmetic mean, `0.0` for no values.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
