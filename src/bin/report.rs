//! Footfall Report
//!
//! Prints the stats summary for one day, or for all time, as JSON:
//!
//! ```text
//! footfall-report                     # today in METRICS_TZ
//! footfall-report --date 2024-05-01
//! footfall-report --overall           # same as --scope overall
//! ```
//!
//! Logs go to stderr; stdout only ever carries the JSON document.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use footfall::config::{generate_default_config, Config};
use footfall::ingest::MetricsTimezone;
use footfall::logging::init_tracing;
use footfall::stats::{Aggregator, Scope, ScopeError};
use footfall::storage::RecordStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "footfall-report")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Summarize recorded visits and downloads")]
pub struct Cli {
    /// Day to report (YYYY-MM-DD). Default: today in the metrics timezone
    #[arg(long, conflicts_with_all = ["overall", "scope"])]
    pub date: Option<String>,

    /// Report over every recorded event
    #[arg(long)]
    pub overall: bool,

    /// Report scope
    #[arg(long, value_enum)]
    pub scope: Option<ReportScope>,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print a default config file and exit
    #[arg(long)]
    pub print_default_config: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportScope {
    Overall,
}

impl Cli {
    /// Scope selected by the flags, falling back to `today`
    fn resolve_scope(&self, timezone: &MetricsTimezone) -> Result<Scope, ScopeError> {
        if self.overall || self.scope == Some(ReportScope::Overall) {
            return Ok(Scope::AllTime);
        }

        match self.date.as_deref() {
            Some(date) => Scope::parse_date(date),
            None => Ok(Scope::Day(timezone.today())),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.print_default_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging).context("failed to initialize logging")?;

    let timezone = config.metrics.timezone()?;
    let scope = cli.resolve_scope(&timezone)?;

    let log_dir = config.storage.log_dir.display();
    let store = RecordStore::open(&config.storage)
        .await
        .with_context(|| format!("cannot open log directory {}", log_dir))?;

    let summary = Aggregator::new(Arc::new(store))
        .summarize(&scope)
        .await
        .context("aggregation failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
