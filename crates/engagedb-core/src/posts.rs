use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Metric, Platform};

/// Raw counters recorded for a post. `None` means the value was never
/// supplied, which is different from an observed zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub view: Option<i64>,
    pub like: Option<i64>,
    pub comment: Option<i64>,
    pub share: Option<i64>,
    pub save: Option<i64>,
}

impl PostMetrics {
    /// Stored value for a post metric. Always `None` for [`Metric::Follower`].
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<i64> {
        match metric {
            Metric::View => self.view,
            Metric::Like => self.like,
            Metric::Comment => self.comment,
            Metric::Share => self.share,
            Metric::Save => self.save,
            Metric::Follower => None,
        }
    }

    /// `like + comment + share + save`, with missing counts read as zero.
    ///
    /// Views and followers are reach, not engagement, so they never count.
    #[must_use]
    pub fn total_engagements(&self) -> i64 {
        [self.like, self.comment, self.share, self.save]
            .into_iter()
            .map(|v| v.unwrap_or(0))
            .fold(0_i64, i64::saturating_add)
    }

    /// `true` when no counter was supplied at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Metric::POST_METRICS.iter().all(|m| self.get(*m).is_none())
    }

    /// First metric holding a negative count, if any.
    #[must_use]
    pub fn first_negative(&self) -> Option<Metric> {
        Metric::POST_METRICS
            .into_iter()
            .find(|m| self.get(*m).is_some_and(|v| v < 0))
    }

    /// Overlay `update` on `self`: supplied values win, blanks keep the old value.
    #[must_use]
    pub fn merged_with(&self, update: &PostMetrics) -> PostMetrics {
        PostMetrics {
            view: update.view.or(self.view),
            like: update.like.or(self.like),
            comment: update.comment.or(self.comment),
            share: update.share.or(self.share),
            save: update.save.or(self.save),
        }
    }
}

/// Lifecycle status derived from a post's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Still collecting metrics.
    Running,
    /// Old enough that its numbers are considered final.
    Valid,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Running => write!(f, "running"),
            PostStatus::Valid => write!(f, "valid"),
        }
    }
}

/// `Running` while the post is at most `window_days` old on `today`, `Valid` afterwards.
///
/// Posts dated in the future are still running.
#[must_use]
pub fn derive_status(post_date: NaiveDate, today: NaiveDate, window_days: u32) -> PostStatus {
    let age_days = (today - post_date).num_days();
    if age_days <= i64::from(window_days) {
        PostStatus::Running
    } else {
        PostStatus::Valid
    }
}

/// A tracked social post with its latest metrics and engagement target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub public_id: Uuid,
    pub platform: Platform,
    pub title: String,
    pub post_url: Option<String>,
    pub post_date: NaiveDate,
    pub report_date: NaiveDate,
    pub metrics: PostMetrics,
    pub target_engagement: Option<f64>,
    pub target_achieved_date: Option<NaiveDate>,
}

impl PostRecord {
    #[must_use]
    pub fn status(&self, today: NaiveDate, window_days: u32) -> PostStatus {
        derive_status(self.post_date, today, window_days)
    }
}

/// One follower-count observation for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerSample {
    pub platform: Platform,
    pub follower_count: i64,
    pub recorded_date: NaiveDate,
}

/// A saved engagement-rate expression from the append-only formula log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaSetting {
    pub id: i64,
    pub name: String,
    pub engagement_formula: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Pick a unique title for a new post.
///
/// If `requested` is free it is returned unchanged. Otherwise the smallest
/// numeric suffix `n >= 1` for which `requested + n` is unused is appended,
/// so a third "Launch" becomes "Launch2".
#[must_use]
pub fn dedupe_title(requested: &str, existing: &[String]) -> String {
    let taken: HashSet<&str> = existing.iter().map(String::as_str).collect();
    if !taken.contains(requested) {
        return requested.to_string();
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{requested}{counter}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        counter += 1;
    }
}
