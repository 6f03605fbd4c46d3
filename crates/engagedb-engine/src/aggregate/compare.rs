use chrono::NaiveDate;
use engagedb_core::{CoreError, DateRange, FollowerSample, Metric, Platform, PostRecord, YearMonth};
use serde::Serialize;

use super::{mean, Change, MetricChanges, MetricTotals};
use crate::calculator::EngagementCalculator;
use crate::error::{EngineError, ValidationError};
use crate::resolver::latest_on_or_before;
use crate::store::{EngagementStore, PostFilter};

/// One calendar month of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: YearMonth,
    pub month_label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub totals: MetricTotals,
    /// Latest follower count on or before `end`, summed across platforms
    /// when no platform filter applies.
    pub follower_count: i64,
    pub post_count: usize,
    pub average_er: f64,
}

impl MonthBucket {
    fn has_posts(&self) -> bool {
        self.post_count > 0
    }
}

/// Month-over-month comparison.
///
/// Changes compare the newest month with posts (the reference) against the
/// mean of the other months with posts (the baseline).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub end_month: YearMonth,
    pub months: u32,
    pub platform: Option<Platform>,
    pub monthly_buckets: Vec<MonthBucket>,
    pub totals: MetricTotals,
    pub metric_change: MetricChanges,
    pub follower_change: Change,
    pub average_er: f64,
    pub total_posts: usize,
}

/// `months + 1` consecutive months ending at `end_month`, oldest first.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyMonths`] when `months > max_months` and
/// [`ValidationError::Calendar`] if the run would leave chrono's date range.
pub fn month_buckets(
    end_month: YearMonth,
    months: u32,
    max_months: u32,
) -> Result<Vec<YearMonth>, ValidationError> {
    if months > max_months {
        return Err(ValidationError::TooManyMonths {
            requested: months,
            max: max_months,
        });
    }

    let mut buckets = vec![end_month];
    let mut current = end_month;
    for _ in 0..months {
        current = current
            .previous()
            .ok_or_else(|| CoreError::InvalidMonth(current.to_string()))?;
        buckets.push(current);
    }
    buckets.reverse();
    Ok(buckets)
}

/// Build a comparison over the `months + 1` months ending at `end_month`.
///
/// Each bucket's engagement rates and follower count use the bucket's last
/// day as the reference date.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for too many months and
/// [`EngineError::Storage`] if any read fails.
pub async fn comparison_report<S: EngagementStore>(
    store: &S,
    calculator: &EngagementCalculator,
    platform: Option<Platform>,
    end_month: YearMonth,
    months: u32,
    max_months: u32,
) -> Result<ComparisonReport, EngineError> {
    let calendar = month_buckets(end_month, months, max_months)?;
    let oldest = calendar.first().copied().unwrap_or(end_month);
    let span = DateRange::new(oldest.first_day(), end_month.last_day())?;

    let posts = store
        .fetch_posts(&PostFilter::new(platform, Some(span)))
        .await?;
    let samples = store
        .follower_samples(platform, Some(DateRange::up_to(span.end())))
        .await?;

    let mut session = calculator.session(store);
    let mut buckets = Vec::with_capacity(calendar.len());
    for month in calendar {
        let in_month: Vec<&PostRecord> = posts
            .iter()
            .filter(|p| month.contains(p.post_date))
            .collect();

        let mut rates = Vec::with_capacity(in_month.len());
        for post in &in_month {
            rates.push(session.rate(post, month.last_day()).await?);
        }

        buckets.push(MonthBucket {
            month,
            month_label: month.label(),
            start: month.first_day(),
            end: month.last_day(),
            totals: in_month.iter().map(|p| &p.metrics).collect(),
            follower_count: follower_count_at(&samples, platform, month.last_day()),
            post_count: in_month.len(),
            average_er: mean(&rates),
        });
    }

    tracing::debug!(
        %end_month,
        months,
        posts = posts.len(),
        "built comparison report"
    );
    Ok(summarize(end_month, months, platform, buckets))
}

fn follower_count_at(samples: &[FollowerSample], platform: Option<Platform>, date: NaiveDate) -> i64 {
    let platforms: &[Platform] = match platform {
        Some(ref p) => std::slice::from_ref(p),
        None => &Platform::ALL,
    };
    platforms
        .iter()
        .filter_map(|p| latest_on_or_before(samples, *p, date))
        .map(|s| s.follower_count)
        .fold(0_i64, i64::saturating_add)
}

fn summarize(
    end_month: YearMonth,
    months: u32,
    platform: Option<Platform>,
    buckets: Vec<MonthBucket>,
) -> ComparisonReport {
    let mut totals = MetricTotals::default();
    for bucket in &buckets {
        totals.merge(&bucket.totals);
    }
    let data: Vec<&MonthBucket> = buckets.iter().filter(|b| b.has_posts()).collect();

    #[allow(clippy::cast_precision_loss)]
    let metric_change = Metric::POST_METRICS
        .into_iter()
        .map(|metric| {
            let values: Vec<f64> = data.iter().map(|b| b.totals.get(metric) as f64).collect();
            (metric, reference_change(&values))
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let follower_values: Vec<f64> = data.iter().map(|b| b.follower_count as f64).collect();
    let bucket_rates: Vec<f64> = data.iter().map(|b| b.average_er).collect();

    ComparisonReport {
        end_month,
        months,
        platform,
        totals,
        metric_change,
        follower_change: reference_change(&follower_values),
        average_er: mean(&bucket_rates),
        total_posts: buckets.iter().map(|b| b.post_count).sum(),
        monthly_buckets: buckets,
    }
}

/// Last value against the mean of the ones before it. A lone value is
/// compared with itself; no values compare as zero.
fn reference_change(values: &[f64]) -> Change {
    match values.split_last() {
        None => Change::default(),
        Some((reference, [])) => Change::flat(*reference),
        Some((reference, baseline)) => Change::between(mean(baseline), *reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn bucket(month: YearMonth, view: i64, posts: usize, er: f64) -> MonthBucket {
        MonthBucket {
            month,
            month_label: month.label(),
            start: month.first_day(),
            end: month.last_day(),
            totals: MetricTotals {
                view,
                ..MetricTotals::default()
            },
            follower_count: 0,
            post_count: posts,
            average_er: er,
        }
    }

    #[test]
    fn buckets_roll_back_over_year_end() {
        let months = month_buckets(ym(2024, 1), 2, 24).unwrap();
        assert_eq!(months, vec![ym(2023, 11), ym(2023, 12), ym(2024, 1)]);
        assert_eq!(
            months[0].first_day(),
            NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()
        );
        assert_eq!(
            months[0].last_day(),
            NaiveDate::from_ymd_opt(2023, 11, 30).unwrap()
        );
    }

    #[test]
    fn zero_months_is_a_single_bucket() {
        assert_eq!(month_buckets(ym(2024, 5), 0, 24).unwrap(), vec![ym(2024, 5)]);
    }

    #[test]
    fn month_count_is_capped() {
        assert_eq!(
            month_buckets(ym(2024, 5), 25, 24),
            Err(ValidationError::TooManyMonths {
                requested: 25,
                max: 24
            })
        );
    }

    #[test]
    fn reference_is_compared_with_mean_of_earlier_buckets() {
        let report = summarize(
            ym(2024, 3),
            2,
            None,
            vec![
                bucket(ym(2024, 1), 10, 1, 2.0),
                bucket(ym(2024, 2), 20, 1, 4.0),
                bucket(ym(2024, 3), 90, 1, 6.0),
            ],
        );
        let view = report.metric_change[&Metric::View];
        assert_eq!(view.start, 15.0);
        assert_eq!(view.end, 90.0);
        assert_eq!(view.diff, 75.0);
        assert_eq!(view.pct, 500.0);
        assert_eq!(report.totals.view, 120);
        assert_eq!(report.average_er, 4.0);
    }

    #[test]
    fn empty_buckets_are_reported_but_not_compared() {
        let report = summarize(
            ym(2024, 3),
            2,
            None,
            vec![
                bucket(ym(2024, 1), 40, 2, 3.0),
                bucket(ym(2024, 2), 80, 1, 5.0),
                bucket(ym(2024, 3), 0, 0, 0.0),
            ],
        );
        assert_eq!(report.monthly_buckets.len(), 3);
        let view = report.metric_change[&Metric::View];
        assert_eq!(view.start, 40.0);
        assert_eq!(view.end, 80.0);
        assert_eq!(report.average_er, 4.0);
        assert_eq!(report.total_posts, 3);
    }

    #[test]
    fn single_data_bucket_has_no_change() {
        let report = summarize(
            ym(2024, 3),
            1,
            None,
            vec![bucket(ym(2024, 2), 0, 0, 0.0), bucket(ym(2024, 3), 70, 2, 1.5)],
        );
        let view = report.metric_change[&Metric::View];
        assert_eq!(view, Change::flat(70.0));
        assert_eq!(view.diff, 0.0);
        assert_eq!(view.pct, 0.0);
    }

    #[test]
    fn follower_count_sums_platforms_without_filter() {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let samples = vec![
            FollowerSample {
                platform: Platform::Tiktok,
                follower_count: 100,
                recorded_date: d(1, 10),
            },
            FollowerSample {
                platform: Platform::Youtube,
                follower_count: 30,
                recorded_date: d(1, 20),
            },
            FollowerSample {
                platform: Platform::Tiktok,
                follower_count: 150,
                recorded_date: d(2, 10),
            },
        ];
        assert_eq!(follower_count_at(&samples, None, d(1, 31)), 130);
        assert_eq!(follower_count_at(&samples, None, d(2, 29)), 180);
        assert_eq!(
            follower_count_at(&samples, Some(Platform::Youtube), d(2, 29)),
            30
        );
        assert_eq!(follower_count_at(&samples, None, d(1, 1)), 0);
    }
}
