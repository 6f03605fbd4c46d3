//! Engagement analytics engine.
//!
//! Evaluates operator-defined engagement-rate formulas over post metrics,
//! tracks per-post engagement targets, and aggregates metrics over date
//! ranges and month-over-month comparisons. Persistence is reached only
//! through the [`EngagementStore`] trait.

pub mod aggregate;
pub mod calculator;
pub mod error;
pub mod formula;
pub mod formula_store;
pub mod memory;
pub mod resolver;
pub mod store;
pub mod tracker;
pub mod updates;

pub use aggregate::{
    comparison_report, month_buckets, range_report, Change, ComparisonReport, MetricChanges,
    MetricTotals, MonthBucket, RangeReport,
};
pub use calculator::{EngagementCalculator, PostEngagement, RateSession};
pub use error::{EngineError, FormulaError, StorageError, ValidationError};
pub use formula::{evaluate, Formula, MetricBindings, DEFAULT_FORMULA};
pub use formula_store::{activate_formula, active_formula, ActiveFormula};
pub use memory::MemoryStore;
pub use resolver::{latest_on_or_before, MetricResolver};
pub use store::{EngagementStore, MetricUpdate, PostFilter};
pub use tracker::{reset_target, set_target, TargetState};
pub use updates::{apply_metric_updates, BatchItemError, BatchReport, UpdateOptions};
