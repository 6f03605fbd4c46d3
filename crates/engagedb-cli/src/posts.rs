//! Post command handlers for the CLI.
//!
//! `update` applies a JSON batch through the engine; a bad row is reported
//! and skipped rather than aborting the rest of the batch.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Days, NaiveDate};
use clap::{Args, Subcommand};
use engagedb_core::{format_display_date, AppConfig, Platform, PostMetrics, PostRecord};
use engagedb_db::{DbError, NewPost, PgStore};
use engagedb_engine::{apply_metric_updates, EngagementCalculator, MetricUpdate, UpdateOptions};

use crate::{fmt_opt, fmt_title};

/// Sub-commands available under `posts`.
#[derive(Debug, Subcommand)]
pub enum PostsCommands {
    /// Add a post
    Add(AddPostArgs),
    /// List posts, newest first
    List {
        /// Only show posts from this platform
        #[arg(long)]
        platform: Option<Platform>,
        /// Maximum number of posts to show
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Apply a JSON array of metric updates
    Update {
        /// Path to a JSON file such as `[{"post_id": 1, "view": 120, "like": 9}]`
        #[arg(long)]
        file: PathBuf,
    },
    /// List posts still inside the running window, the candidates for an update
    Pending,
    /// Delete a post
    Delete {
        /// Post id
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct AddPostArgs {
    #[arg(long)]
    pub platform: Platform,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub url: Option<String>,
    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub view: Option<i64>,
    #[arg(long)]
    pub like: Option<i64>,
    #[arg(long)]
    pub comment: Option<i64>,
    #[arg(long)]
    pub share: Option<i64>,
    #[arg(long)]
    pub save: Option<i64>,
}

impl AddPostArgs {
    fn metrics(&self) -> PostMetrics {
        PostMetrics {
            view: self.view,
            like: self.like,
            comment: self.comment,
            share: self.share,
            save: self.save,
        }
    }
}

pub(crate) async fn run(
    store: &PgStore,
    config: &AppConfig,
    command: PostsCommands,
) -> anyhow::Result<()> {
    match command {
        PostsCommands::Add(args) => run_posts_add(store, config, args).await,
        PostsCommands::List { platform, limit } => {
            run_posts_list(store, config, platform, limit).await
        }
        PostsCommands::Update { file } => run_posts_update(store, config, &file).await,
        PostsCommands::Pending => run_posts_pending(store, config).await,
        PostsCommands::Delete { id } => run_posts_delete(store, id).await,
    }
}

/// Insert a post. A taken title gets a numeric suffix.
///
/// # Errors
///
/// Returns an error for negative counts, an empty title, or a failed insert.
pub(crate) async fn run_posts_add(
    store: &PgStore,
    config: &AppConfig,
    args: AddPostArgs,
) -> anyhow::Result<()> {
    let metrics = args.metrics();
    if let Some(metric) = metrics.first_negative() {
        anyhow::bail!("{metric} cannot be negative");
    }
    let title = args.title.trim();
    if title.is_empty() {
        anyhow::bail!("title must not be empty");
    }

    let new_post = NewPost {
        platform: args.platform,
        title: title.to_string(),
        post_url: args.url.filter(|u| !u.trim().is_empty()),
        post_date: args.date,
        metrics,
    };
    let row = engagedb_db::insert_post(store.pool(), &new_post, config.today()).await?;

    if row.title != title {
        println!("title '{title}' is taken; stored as '{}'", row.title);
    }
    println!("added post {} ({})", row.id, row.public_id);
    Ok(())
}

/// Print posts with their engagement rate, newest first.
///
/// # Errors
///
/// Returns an error if posts or the formula cannot be read.
pub(crate) async fn run_posts_list(
    store: &PgStore,
    config: &AppConfig,
    platform: Option<Platform>,
    limit: usize,
) -> anyhow::Result<()> {
    let rows = engagedb_db::list_posts(store.pool(), platform, None).await?;
    let posts = rows
        .into_iter()
        .rev()
        .take(limit)
        .map(engagedb_db::PostRow::into_record)
        .collect::<Result<Vec<_>, _>>()?;

    if posts.is_empty() {
        println!("no posts found; add one with `posts add`");
        return Ok(());
    }
    print_posts(store, config, &posts).await
}

/// Apply a batch of metric updates read from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the active
/// formula cannot be loaded. Per-row failures are printed, not returned.
pub(crate) async fn run_posts_update(
    store: &PgStore,
    config: &AppConfig,
    file: &Path,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let updates: Vec<MetricUpdate> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of metric updates", file.display()))?;

    let calculator = EngagementCalculator::load(store).await?;
    let options = UpdateOptions {
        today: config.today(),
        regression: config.target_regression,
    };
    let report = apply_metric_updates(store, &calculator, &updates, options).await;

    println!(
        "updated: {}, skipped: {}, targets rechecked: {}, errors: {}",
        report.updated,
        report.skipped,
        report.recomputed,
        report.errors.len()
    );
    for error in &report.errors {
        println!("  {error}");
    }
    Ok(())
}

/// List the posts still collecting metrics.
///
/// # Errors
///
/// Returns an error if posts or the formula cannot be read.
pub(crate) async fn run_posts_pending(store: &PgStore, config: &AppConfig) -> anyhow::Result<()> {
    let today = config.today();
    let since = today
        .checked_sub_days(Days::new(u64::from(config.running_window_days)))
        .unwrap_or(NaiveDate::MIN);
    let posts = engagedb_db::list_posts_since(store.pool(), since)
        .await?
        .into_iter()
        .map(engagedb_db::PostRow::into_record)
        .collect::<Result<Vec<_>, _>>()?;

    if posts.is_empty() {
        println!(
            "no posts from the last {} days",
            config.running_window_days
        );
        return Ok(());
    }
    print_posts(store, config, &posts).await
}

/// # Errors
///
/// Returns an error if the post does not exist or the delete fails.
pub(crate) async fn run_posts_delete(store: &PgStore, id: i64) -> anyhow::Result<()> {
    match engagedb_db::delete_post(store.pool(), id).await {
        Ok(()) => {
            tracing::info!(post_id = id, "post deleted");
            println!("deleted post {id}");
            Ok(())
        }
        Err(DbError::NotFound) => anyhow::bail!("post {id} not found"),
        Err(e) => Err(e.into()),
    }
}

async fn print_posts(
    store: &PgStore,
    config: &AppConfig,
    posts: &[PostRecord],
) -> anyhow::Result<()> {
    let today = config.today();
    let calculator = EngagementCalculator::load(store).await?;
    let mut session = calculator.session(store);

    println!(
        "{:<7}{:<11}{:<12}{:<9}{:>9}{:>8}{:>8}{:>7}{:>7}{:>9}{:>8}{:>8}  {:<12}TITLE",
        "ID", "PLATFORM", "DATE", "STATUS", "VIEW", "LIKE", "COMMENT", "SHARE", "SAVE", "ER%",
        "TOTAL", "TARGET", "ACHIEVED"
    );
    for post in posts {
        let engagement = session.engagement(post, today).await?;
        let m = &post.metrics;
        println!(
            "{:<7}{:<11}{:<12}{:<9}{:>9}{:>8}{:>8}{:>7}{:>7}{:>9.2}{:>8}{:>8}  {:<12}{}",
            post.id,
            post.platform.as_str(),
            format_display_date(post.post_date),
            post.status(today, config.running_window_days).to_string(),
            fmt_opt(m.view),
            fmt_opt(m.like),
            fmt_opt(m.comment),
            fmt_opt(m.share),
            fmt_opt(m.save),
            engagement.engagement_rate,
            engagement.total_engagements,
            fmt_opt(post.target_engagement),
            fmt_opt(post.target_achieved_date.map(format_display_date)),
            fmt_title(&post.title),
        );
    }
    Ok(())
}
