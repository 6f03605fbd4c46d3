use clap::{Args, Subcommand};
use engagedb_core::Metric;
use engagedb_db::PgStore;
use engagedb_engine::{
    activate_formula, active_formula, EngagementStore, Formula, MetricBindings,
};

/// Sub-commands available under `formula`.
#[derive(Debug, Subcommand)]
pub enum FormulaCommands {
    /// Print the active formula
    Show,
    /// Validate a formula and make it the active one
    Set {
        /// Label stored with the formula
        #[arg(long)]
        name: String,
        /// Expression over like, comment, view, share, save and follower
        #[arg(long)]
        expr: String,
    },
    /// List every saved formula, newest first
    History,
    /// Evaluate an expression against ad-hoc values without saving it
    Test(FormulaTestArgs),
}

#[derive(Debug, Args)]
pub struct FormulaTestArgs {
    #[arg(long)]
    pub expr: String,
    #[arg(long, default_value = "0")]
    pub view: f64,
    #[arg(long, default_value = "0")]
    pub like: f64,
    #[arg(long, default_value = "0")]
    pub comment: f64,
    #[arg(long, default_value = "0")]
    pub share: f64,
    #[arg(long, default_value = "0")]
    pub save: f64,
    #[arg(long, default_value = "0")]
    pub follower: f64,
}

impl FormulaTestArgs {
    fn bindings(&self) -> MetricBindings {
        [
            (Metric::View, self.view),
            (Metric::Like, self.like),
            (Metric::Comment, self.comment),
            (Metric::Share, self.share),
            (Metric::Save, self.save),
            (Metric::Follower, self.follower),
        ]
        .into_iter()
        .collect()
    }
}

pub(crate) async fn run(store: &PgStore, command: FormulaCommands) -> anyhow::Result<()> {
    match command {
        FormulaCommands::Show => run_formula_show(store).await,
        FormulaCommands::Set { name, expr } => run_formula_set(store, &name, &expr).await,
        FormulaCommands::History => run_formula_history(store).await,
        FormulaCommands::Test(args) => run_formula_test(&args),
    }
}

/// # Errors
///
/// Returns an error if the formula cannot be read.
pub(crate) async fn run_formula_show(store: &PgStore) -> anyhow::Result<()> {
    let active = active_formula(store).await?;
    match &active.setting {
        Some(setting) => println!("{} (#{}): {}", setting.name, setting.id, setting.engagement_formula),
        None => println!("default: {}", active.text()),
    }
    if let Err(e) = Formula::parse(active.text()) {
        println!("warning: the active formula does not parse ({e}); rates read as 0");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the name is blank, the expression does not parse, or
/// the write fails.
pub(crate) async fn run_formula_set(store: &PgStore, name: &str, expr: &str) -> anyhow::Result<()> {
    let setting = activate_formula(store, name, expr).await?;
    println!(
        "activated formula #{} '{}': {}",
        setting.id, setting.name, setting.engagement_formula
    );
    Ok(())
}

/// # Errors
///
/// Returns an error if the history cannot be read.
pub(crate) async fn run_formula_history(store: &PgStore) -> anyhow::Result<()> {
    let history = store.formula_history().await?;
    if history.is_empty() {
        println!("no formulas saved; the default is in use");
        return Ok(());
    }

    println!("{:<3}{:<6}{:<22}{:<24}FORMULA", "", "ID", "CREATED", "NAME");
    for setting in &history {
        let marker = if setting.is_active { "*" } else { "" };
        println!(
            "{:<3}{:<6}{:<22}{:<24}{}",
            marker,
            setting.id,
            setting.created_at.format("%Y-%m-%d %H:%M:%S"),
            setting.name,
            setting.engagement_formula
        );
    }
    Ok(())
}

/// Parse and evaluate `args.expr` locally.
///
/// # Errors
///
/// Returns an error if the expression does not parse.
pub(crate) fn run_formula_test(args: &FormulaTestArgs) -> anyhow::Result<()> {
    let formula = Formula::parse(&args.expr)?;
    let bindings = args.bindings();
    let names: Vec<&str> = formula.metrics().iter().map(|m| m.name()).collect();

    println!("formula: {formula}");
    println!("uses:    {}", names.join(", "));
    match formula.try_evaluate(&bindings) {
        Some(rate) => println!("result:  {rate:.4}"),
        None => println!("result:  0 (undefined, e.g. division by zero)"),
    }
    Ok(())
}
