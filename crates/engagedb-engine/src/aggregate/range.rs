use engagedb_core::{DateRange, FollowerSample, Metric, Platform, PostRecord};
use serde::Serialize;

use super::{mean, Change, MetricChanges, MetricTotals};
use crate::calculator::EngagementCalculator;
use crate::error::StorageError;
use crate::store::{EngagementStore, PostFilter};

/// Aggregate over one inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    pub range: DateRange,
    pub platform: Option<Platform>,
    pub totals: MetricTotals,
    pub metric_change: MetricChanges,
    pub follower_change: Change,
    pub average_er: f64,
    pub total_posts: usize,
}

/// Aggregate posts published within `range`, optionally on one platform.
///
/// Engagement rates use follower counts as of the range end.
///
/// # Errors
///
/// Returns [`StorageError`] if any read fails.
pub async fn range_report<S: EngagementStore>(
    store: &S,
    calculator: &EngagementCalculator,
    platform: Option<Platform>,
    range: DateRange,
) -> Result<RangeReport, StorageError> {
    let posts = store
        .fetch_posts(&PostFilter::new(platform, Some(range)))
        .await?;
    let samples = store.follower_samples(platform, Some(range)).await?;

    let mut session = calculator.session(store);
    let mut rates = Vec::with_capacity(posts.len());
    for post in &posts {
        rates.push(session.rate(post, range.end()).await?);
    }

    tracing::debug!(
        start = %range.start(),
        end = %range.end(),
        posts = posts.len(),
        samples = samples.len(),
        "built range report"
    );
    Ok(build_range_report(range, platform, &posts, &samples, &rates))
}

fn build_range_report(
    range: DateRange,
    platform: Option<Platform>,
    posts: &[PostRecord],
    samples: &[FollowerSample],
    rates: &[f64],
) -> RangeReport {
    RangeReport {
        range,
        platform,
        totals: posts.iter().map(|p| &p.metrics).collect(),
        metric_change: first_to_last_changes(posts),
        follower_change: follower_change(samples),
        average_er: mean(rates),
        total_posts: posts.len(),
    }
}

/// For each post metric, the chronologically first post against the last.
/// Ties on date go to the lower id and a missing count reads as 0.
#[allow(clippy::cast_precision_loss)]
pub(super) fn first_to_last_changes(posts: &[PostRecord]) -> MetricChanges {
    let mut ordered: Vec<&PostRecord> = posts.iter().collect();
    ordered.sort_by_key(|p| (p.post_date, p.id));
    let value = |post: Option<&&PostRecord>, metric: Metric| {
        post.and_then(|p| p.metrics.get(metric)).unwrap_or(0) as f64
    };

    Metric::POST_METRICS
        .into_iter()
        .map(|metric| {
            let change = Change::between(
                value(ordered.first(), metric),
                value(ordered.last(), metric),
            );
            (metric, change)
        })
        .collect()
}

/// First against last sample per platform, summed over platforms.
#[allow(clippy::cast_precision_loss)]
fn follower_change(samples: &[FollowerSample]) -> Change {
    let mut start = 0_i64;
    let mut end = 0_i64;
    for platform in Platform::ALL {
        let mut series: Vec<&FollowerSample> =
            samples.iter().filter(|s| s.platform == platform).collect();
        series.sort_by_key(|s| s.recorded_date);
        if let (Some(first), Some(last)) = (series.first(), series.last()) {
            start = start.saturating_add(first.follower_count);
            end = end.saturating_add(last.follower_count);
        }
    }
    Change::between(start as f64, end as f64)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use engagedb_core::PostMetrics;
    use uuid::Uuid;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn post(id: i64, posted: NaiveDate, metrics: PostMetrics) -> PostRecord {
        PostRecord {
            id,
            public_id: Uuid::new_v4(),
            platform: Platform::Tiktok,
            title: format!("post {id}"),
            post_url: None,
            post_date: posted,
            report_date: posted,
            metrics,
            target_engagement: None,
            target_achieved_date: None,
        }
    }

    fn views(n: i64) -> PostMetrics {
        PostMetrics {
            view: Some(n),
            ..PostMetrics::default()
        }
    }

    #[test]
    fn missing_endpoint_count_reads_as_zero() {
        let posts = vec![
            post(1, date(2024, 1, 1), PostMetrics::default()),
            post(2, date(2024, 1, 3), views(150)),
        ];
        let changes = first_to_last_changes(&posts);
        assert_eq!(
            changes[&Metric::View],
            Change {
                start: 0.0,
                end: 150.0,
                diff: 150.0,
                pct: 100.0
            }
        );
        assert_eq!(changes[&Metric::Like], Change::between(0.0, 0.0));
    }

    #[test]
    fn middle_posts_do_not_affect_the_change() {
        let posts = vec![
            post(1, date(2024, 1, 1), views(100)),
            post(2, date(2024, 1, 2), views(900)),
            post(3, date(2024, 1, 3), PostMetrics::default()),
        ];
        let change = first_to_last_changes(&posts)[&Metric::View];
        assert_eq!(change.start, 100.0);
        assert_eq!(change.end, 0.0);
        assert_eq!(change.diff, -100.0);
    }

    #[test]
    fn same_day_posts_are_ordered_by_id() {
        let posts = vec![
            post(9, date(2024, 1, 1), views(30)),
            post(2, date(2024, 1, 1), views(10)),
        ];
        let changes = first_to_last_changes(&posts);
        assert_eq!(changes[&Metric::View].start, 10.0);
        assert_eq!(changes[&Metric::View].end, 30.0);
    }

    #[test]
    fn follower_change_sums_platform_endpoints() {
        let samples = vec![
            FollowerSample {
                platform: Platform::Tiktok,
                follower_count: 100,
                recorded_date: date(2024, 1, 1),
            },
            FollowerSample {
                platform: Platform::Instagram,
                follower_count: 50,
                recorded_date: date(2024, 1, 15),
            },
            FollowerSample {
                platform: Platform::Tiktok,
                follower_count: 140,
                recorded_date: date(2024, 2, 1),
            },
        ];
        let change = follower_change(&samples);
        assert_eq!(change.start, 150.0);
        assert_eq!(change.end, 190.0);
    }

    #[test]
    fn empty_range_reports_zeros() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let report = build_range_report(range, None, &[], &[], &[]);
        assert_eq!(report.total_posts, 0);
        assert_eq!(report.average_er, 0.0);
        assert_eq!(report.totals, MetricTotals::default());
        assert_eq!(report.follower_change, Change::default());
    }
}
