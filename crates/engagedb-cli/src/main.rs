mod analytics;
mod followers;
mod formula;
mod posts;
mod target;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::analytics::AnalyticsCommands;
use crate::followers::FollowersCommands;
use crate::formula::FormulaCommands;
use crate::posts::PostsCommands;
use crate::target::TargetCommands;

#[derive(Debug, Parser)]
#[command(name = "engagedb-cli")]
#[command(about = "Engagement analytics command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add, list, update and delete tracked posts
    Posts {
        #[command(subcommand)]
        command: PostsCommands,
    },
    /// Record and list platform follower counts
    Followers {
        #[command(subcommand)]
        command: FollowersCommands,
    },
    /// Show, change and try out the engagement formula
    Formula {
        #[command(subcommand)]
        command: FormulaCommands,
    },
    /// Set or reset a post's engagement target
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Aggregate metrics over a date range or a run of months
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("engagedb-cli ready; run with --help to list commands");
        return Ok(());
    };

    // Trying a formula needs neither configuration nor a database.
    if let Commands::Formula {
        command: FormulaCommands::Test(ref args),
    } = command
    {
        init_tracing("warn")?;
        return formula::run_formula_test(args);
    }

    let config = engagedb_core::load_app_config()?;
    init_tracing(&config.log_level)?;

    let pool_config = engagedb_db::PoolConfig::from_app_config(&config);
    let pool = engagedb_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to the database")?;
    let store = engagedb_db::PgStore::new(pool);

    match command {
        Commands::Posts { command } => posts::run(&store, &config, command).await,
        Commands::Followers { command } => followers::run(&store, &config, command).await,
        Commands::Formula { command } => formula::run(&store, command).await,
        Commands::Target { command } => target::run(&store, command).await,
        Commands::Analytics { command } => analytics::run(&store, &config, command).await,
        Commands::Db { command } => run_db(store.pool(), command).await,
    }
}

/// Log to stderr so command output on stdout stays machine-readable.
fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run_db(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            engagedb_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = engagedb_db::run_migrations(pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

/// Format an optional value for table output, `"-"` when absent.
fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Truncate long titles for table output.
fn fmt_title(title: &str) -> String {
    if title.chars().count() > 40 {
        format!("{}...", title.chars().take(40).collect::<String>())
    } else {
        title.to_string()
    }
}
