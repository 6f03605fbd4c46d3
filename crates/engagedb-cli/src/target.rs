use clap::Subcommand;
use engagedb_db::PgStore;

/// Sub-commands available under `target`.
#[derive(Debug, Subcommand)]
pub enum TargetCommands {
    /// Set an engagement-rate target on a post that has none
    Set {
        /// Post id
        post_id: i64,
        /// Target engagement rate, e.g. 4.5
        value: f64,
    },
    /// Clear a post's target and achievement date
    Reset {
        /// Post id
        post_id: i64,
    },
}

pub(crate) async fn run(store: &PgStore, command: TargetCommands) -> anyhow::Result<()> {
    match command {
        TargetCommands::Set { post_id, value } => {
            engagedb_engine::set_target(store, post_id, value).await?;
            println!("post {post_id}: target set to {value}");
        }
        TargetCommands::Reset { post_id } => {
            engagedb_engine::reset_target(store, post_id).await?;
            println!("post {post_id}: target cleared");
        }
    }
    Ok(())
}
