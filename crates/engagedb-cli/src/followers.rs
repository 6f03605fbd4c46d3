use chrono::NaiveDate;
use clap::Subcommand;
use engagedb_core::{format_display_date, AppConfig, Platform};
use engagedb_db::PgStore;

/// Sub-commands available under `followers`.
#[derive(Debug, Subcommand)]
pub enum FollowersCommands {
    /// Record a platform's follower count; replaces any sample from the same month
    Record {
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        count: i64,
        /// Observation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List recorded follower counts
    List {
        #[arg(long)]
        platform: Option<Platform>,
    },
}

pub(crate) async fn run(
    store: &PgStore,
    config: &AppConfig,
    command: FollowersCommands,
) -> anyhow::Result<()> {
    match command {
        FollowersCommands::Record {
            platform,
            count,
            date,
        } => run_followers_record(store, platform, count, date.unwrap_or_else(|| config.today())).await,
        FollowersCommands::List { platform } => run_followers_list(store, platform).await,
    }
}

/// # Errors
///
/// Returns an error for a negative count or a failed write.
pub(crate) async fn run_followers_record(
    store: &PgStore,
    platform: Platform,
    count: i64,
    date: NaiveDate,
) -> anyhow::Result<()> {
    if count < 0 {
        anyhow::bail!("follower count cannot be negative");
    }
    let row = engagedb_db::upsert_follower_sample(store.pool(), platform, count, date).await?;
    tracing::info!(%platform, count, %date, "follower sample recorded");
    println!(
        "{platform}: {} followers as of {}",
        row.follower_count,
        format_display_date(row.recorded_date)
    );
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_followers_list(
    store: &PgStore,
    platform: Option<Platform>,
) -> anyhow::Result<()> {
    let samples = engagedb_db::list_follower_samples(store.pool(), platform, None).await?;
    if samples.is_empty() {
        println!("no follower samples recorded");
        return Ok(());
    }

    println!("{:<11}{:<12}{:>12}", "PLATFORM", "DATE", "FOLLOWERS");
    for sample in &samples {
        println!(
            "{:<11}{:<12}{:>12}",
            sample.platform.as_str(),
            format_display_date(sample.recorded_date),
            sample.follower_count
        );
    }
    Ok(())
}
