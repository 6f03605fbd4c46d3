use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A named engagement metric.
///
/// This is the closed set of identifiers an engagement formula may use.
/// `Follower` is the only one not stored on a post; it comes from the
/// platform's follower series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    View,
    Like,
    Comment,
    Share,
    Save,
    Follower,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::View,
        Metric::Like,
        Metric::Comment,
        Metric::Share,
        Metric::Save,
        Metric::Follower,
    ];

    /// Metrics stored directly on a post record.
    pub const POST_METRICS: [Metric; 5] = [
        Metric::View,
        Metric::Like,
        Metric::Comment,
        Metric::Share,
        Metric::Save,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Metric::View => "view",
            Metric::Like => "like",
            Metric::Comment => "comment",
            Metric::Share => "share",
            Metric::Save => "save",
            Metric::Follower => "follower",
        }
    }

    /// Exact, case-sensitive lookup used by the formula lexer.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Stable position in [`Metric::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn is_post_metric(self) -> bool {
        self != Metric::Follower
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::from_name(s).ok_or_else(|| CoreError::InvalidMetric(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_position_in_all() {
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            assert_eq!(metric.index(), i);
        }
    }

    #[test]
    fn from_name_requires_exact_match() {
        assert_eq!(Metric::from_name("like"), Some(Metric::Like));
        assert_eq!(Metric::from_name("Like"), None);
        assert_eq!(Metric::from_name("likes"), None);
        assert_eq!(Metric::from_name("followers"), None);
    }

    #[test]
    fn follower_is_not_a_post_metric() {
        assert!(!Metric::POST_METRICS.contains(&Metric::Follower));
        assert!(!Metric::Follower.is_post_metric());
        assert!(Metric::Save.is_post_metric());
    }
}
