//! Engagement-rate formulas.
//!
//! A formula is arithmetic over the metric names `like`, `comment`, `view`,
//! `share`, `save` and `follower`, numeric literals, `+ - * /` and
//! parentheses. Text is parsed once into an expression tree; evaluation is
//! a walk over that tree with metric values looked up by name, so there is
//! no textual substitution and no way to smuggle other code in.

mod lexer;
mod parser;

use engagedb_core::{Metric, PostMetrics};

use crate::error::FormulaError;
use parser::{BinOp, Expr};

/// Formula used when no formula has been activated.
pub const DEFAULT_FORMULA: &str = "(like + comment + share + save) / view * 100";

/// Numeric value for each metric. Unset metrics read as `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricBindings {
    values: [f64; Metric::ALL.len()],
}

impl MetricBindings {
    /// Bind the five stored post counters; missing counts bind to zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_post_metrics(metrics: &PostMetrics) -> Self {
        let mut bindings = Self::default();
        for metric in Metric::POST_METRICS {
            bindings.set(metric, metrics.get(metric).unwrap_or(0) as f64);
        }
        bindings
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        self.values[metric.index()] = value;
    }

    #[must_use]
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, value);
        self
    }

    #[must_use]
    pub fn get(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }
}

impl FromIterator<(Metric, f64)> for MetricBindings {
    fn from_iter<T: IntoIterator<Item = (Metric, f64)>>(iter: T) -> Self {
        let mut bindings = Self::default();
        for (metric, value) in iter {
            bindings.set(metric, value);
        }
        bindings
    }
}

/// A parsed engagement formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
    metrics: Vec<Metric>,
}

impl Formula {
    /// Parse formula text.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] for empty text, characters outside the
    /// grammar, identifiers that are not metric names, unbalanced
    /// parentheses, or trailing input.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = lexer::tokenize(source)?;
        let expr = parser::parse(&tokens)?;
        Ok(Self::from_expr(source.trim().to_string(), expr))
    }

    /// The built-in [`DEFAULT_FORMULA`], assembled without going through the parser.
    #[must_use]
    pub fn default_formula() -> Self {
        let sum = [Metric::Comment, Metric::Share, Metric::Save]
            .into_iter()
            .fold(Expr::Metric(Metric::Like), |acc, m| {
                Expr::binary(BinOp::Add, acc, Expr::Metric(m))
            });
        let ratio = Expr::binary(BinOp::Div, sum, Expr::Metric(Metric::View));
        let expr = Expr::binary(BinOp::Mul, ratio, Expr::Number(100.0));
        Self::from_expr(DEFAULT_FORMULA.to_string(), expr)
    }

    fn from_expr(source: String, expr: Expr) -> Self {
        let mut metrics = Vec::new();
        expr.collect_metrics(&mut metrics);
        metrics.sort();
        Self {
            source,
            expr,
            metrics,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Metrics the formula mentions, in [`Metric::ALL`] order.
    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    #[must_use]
    pub fn references(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Evaluate, returning `None` when the result is undefined (division by
    /// zero or a non-finite value).
    #[must_use]
    pub fn try_evaluate(&self, bindings: &MetricBindings) -> Option<f64> {
        self.expr.eval(&|m| bindings.get(m))
    }

    /// Evaluate, mapping an undefined result to `0.0`.
    #[must_use]
    pub fn evaluate(&self, bindings: &MetricBindings) -> f64 {
        self.try_evaluate(bindings).unwrap_or(0.0)
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `text` and evaluate it against `bindings` in one step.
///
/// # Errors
///
/// Returns [`FormulaError`] when `text` does not parse.
pub fn evaluate(text: &str, bindings: &MetricBindings) -> Result<f64, FormulaError> {
    Ok(Formula::parse(text)?.evaluate(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bindings() -> MetricBindings {
        MetricBindings::default()
            .with(Metric::Like, 10.0)
            .with(Metric::Comment, 5.0)
            .with(Metric::Share, 2.0)
            .with(Metric::Save, 3.0)
            .with(Metric::View, 100.0)
    }

    #[test]
    fn default_formula_matches_its_text() {
        let parsed = Formula::parse(DEFAULT_FORMULA).unwrap();
        assert_eq!(parsed, Formula::default_formula());
    }

    #[test]
    fn default_formula_scenario_gives_twenty_percent() {
        let rate = evaluate("(like+comment+share+save)/view*100", &sample_bindings()).unwrap();
        assert!((rate - 20.0).abs() < f64::EPSILON, "got {rate}");
    }

    #[test]
    fn zero_views_yield_zero_not_nan() {
        let bindings = sample_bindings().with(Metric::View, 0.0);
        let formula = Formula::default_formula();
        assert_eq!(formula.try_evaluate(&bindings), None);
        assert_eq!(formula.evaluate(&bindings), 0.0);
    }

    #[test]
    fn missing_metrics_bind_to_zero() {
        let bindings = MetricBindings::default().with(Metric::Like, 7.0);
        assert_eq!(evaluate("like + share + follower", &bindings).unwrap(), 7.0);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let formula = Formula::parse("(like * 2 + comment) / (view + follower) * 100").unwrap();
        let bindings = sample_bindings().with(Metric::Follower, 400.0);
        let first = formula.evaluate(&bindings);
        for _ in 0..10 {
            assert_eq!(formula.evaluate(&bindings).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn follower_substring_is_not_substituted() {
        let err = Formula::parse("like / followers_note").unwrap_err();
        assert!(
            matches!(err, FormulaError::UnknownIdentifier { ref name, .. } if name == "followers_note")
        );
    }

    #[test]
    fn references_reports_follower_usage() {
        let with = Formula::parse("(like + comment) / follower * 100").unwrap();
        let without = Formula::default_formula();
        assert!(with.references(Metric::Follower));
        assert!(!without.references(Metric::Follower));
        assert_eq!(
            without.metrics(),
            &[
                Metric::View,
                Metric::Like,
                Metric::Comment,
                Metric::Share,
                Metric::Save
            ]
        );
    }

    #[test]
    fn from_post_metrics_binds_nulls_to_zero() {
        let metrics = PostMetrics {
            view: Some(50),
            like: None,
            comment: Some(4),
            share: None,
            save: None,
        };
        let bindings = MetricBindings::from_post_metrics(&metrics);
        assert_eq!(bindings.get(Metric::View), 50.0);
        assert_eq!(bindings.get(Metric::Like), 0.0);
        assert_eq!(bindings.get(Metric::Comment), 4.0);
        assert_eq!(bindings.get(Metric::Follower), 0.0);
    }

    #[test]
    fn source_is_trimmed() {
        let formula = Formula::parse("  like * 2 \n").unwrap();
        assert_eq!(formula.source(), "like * 2");
    }
}
