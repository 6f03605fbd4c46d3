//! Analytics command handlers for the CLI.
//!
//! Both reports are computed by the engine; this module only prints them,
//! either as a text summary or as pretty JSON with `--json`.

use chrono::NaiveDate;
use clap::Subcommand;
use engagedb_core::{format_display_date, AppConfig, DateRange, Metric, Platform, YearMonth};
use engagedb_db::PgStore;
use engagedb_engine::{
    comparison_report, range_report, Change, EngagementCalculator, MetricChanges, MetricTotals,
};

/// Sub-commands available under `analytics`.
#[derive(Debug, Subcommand)]
pub enum AnalyticsCommands {
    /// Totals and first-to-last changes over an inclusive date range
    Range {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        platform: Option<Platform>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare the newest month with posts against the months before it
    Compare {
        /// Last month of the comparison (YYYY-MM)
        #[arg(long)]
        end_month: YearMonth,
        /// Number of earlier months to include
        #[arg(long, default_value = "2")]
        months: u32,
        #[arg(long)]
        platform: Option<Platform>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

pub(crate) async fn run(
    store: &PgStore,
    config: &AppConfig,
    command: AnalyticsCommands,
) -> anyhow::Result<()> {
    match command {
        AnalyticsCommands::Range {
            start,
            end,
            platform,
            json,
        } => run_analytics_range(store, start, end, platform, json).await,
        AnalyticsCommands::Compare {
            end_month,
            months,
            platform,
            json,
        } => run_analytics_compare(store, config, end_month, months, platform, json).await,
    }
}

/// # Errors
///
/// Returns an error for an inverted range or a failed read.
pub(crate) async fn run_analytics_range(
    store: &PgStore,
    start: NaiveDate,
    end: NaiveDate,
    platform: Option<Platform>,
    json: bool,
) -> anyhow::Result<()> {
    let range = DateRange::new(start, end)?;
    let calculator = EngagementCalculator::load(store).await?;
    let report = range_report(store, &calculator, platform, range).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} to {}{}",
        format_display_date(range.start()),
        format_display_date(range.end()),
        platform_suffix(platform)
    );
    println!("posts:      {}", report.total_posts);
    println!("average ER: {:.2}%", report.average_er);
    println!();
    print_totals_and_changes(&report.totals, &report.metric_change, &report.follower_change);
    Ok(())
}

/// # Errors
///
/// Returns an error for too many months or a failed read.
pub(crate) async fn run_analytics_compare(
    store: &PgStore,
    config: &AppConfig,
    end_month: YearMonth,
    months: u32,
    platform: Option<Platform>,
    json: bool,
) -> anyhow::Result<()> {
    let calculator = EngagementCalculator::load(store).await?;
    let report = comparison_report(
        store,
        &calculator,
        platform,
        end_month,
        months,
        config.max_comparison_months,
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} months ending {}{}",
        report.monthly_buckets.len(),
        end_month.label(),
        platform_suffix(platform)
    );
    println!(
        "{:<16}{:>7}{:>11}{:>9}{:>9}{:>8}{:>8}{:>11}{:>9}",
        "MONTH", "POSTS", "VIEW", "LIKE", "COMMENT", "SHARE", "SAVE", "FOLLOWERS", "ER%"
    );
    for bucket in &report.monthly_buckets {
        println!(
            "{:<16}{:>7}{:>11}{:>9}{:>9}{:>8}{:>8}{:>11}{:>9.2}",
            bucket.month_label,
            bucket.post_count,
            bucket.totals.view,
            bucket.totals.like,
            bucket.totals.comment,
            bucket.totals.share,
            bucket.totals.save,
            bucket.follower_count,
            bucket.average_er
        );
    }
    println!();
    println!("posts:      {}", report.total_posts);
    println!("average ER: {:.2}%", report.average_er);
    println!("changes compare the latest month with posts against the mean of the others");
    println!();
    print_totals_and_changes(&report.totals, &report.metric_change, &report.follower_change);
    Ok(())
}

fn platform_suffix(platform: Option<Platform>) -> String {
    platform.map(|p| format!(" ({p})")).unwrap_or_default()
}

fn print_totals_and_changes(totals: &MetricTotals, changes: &MetricChanges, followers: &Change) {
    println!(
        "{:<10}{:>12}{:>12}{:>12}{:>12}{:>10}",
        "METRIC", "TOTAL", "START", "END", "DIFF", "PCT"
    );
    for metric in Metric::POST_METRICS {
        let change = changes.get(&metric).copied().unwrap_or_default();
        println!(
            "{:<10}{:>12}{:>12.2}{:>12.2}{:>12.2}{:>9.2}%",
            metric.name(),
            totals.get(metric),
            change.start,
            change.end,
            change.diff,
            change.pct
        );
    }
    println!(
        "{:<10}{:>12}{:>12.2}{:>12.2}{:>12.2}{:>9.2}%",
        Metric::Follower.name(),
        "-",
        followers.start,
        followers.end,
        followers.diff,
        followers.pct
    );
}
