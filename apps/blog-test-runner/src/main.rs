//! Runs the end-to-end posts API suite against an in-process server.
//!
//! Exits non-zero when any scenario fails.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use blog_harness::{default_scenarios, run_all, HarnessConfig};

/// Command-line arguments for the test runner.
///
/// Flags override `BLOG_TEST_DATABASE`, `BLOG_TEST_FIXTURES` and
/// `BLOG_TEST_DATA_DIR`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Test database name
    #[arg(long)]
    database: Option<String>,

    /// Directory holding fixture files
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Snapshot directory for the test database
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Only run scenarios whose name contains this text
    #[arg(long)]
    filter: Option<String>,

    /// List scenario names and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut config = HarnessConfig::from_env()?;
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(fixtures) = args.fixtures {
        config.fixtures_dir = fixtures;
    }
    if args.data_dir.is_some() {
        config.data_dir = args.data_dir;
    }
    config.validate()?;

    let scenarios: Vec<_> = default_scenarios(&config)
        .into_iter()
        .filter(|s| args.filter.as_deref().map_or(true, |f| s.name.contains(f)))
        .collect();

    if args.list {
        for scenario in &scenarios {
            println!("{}", scenario.name);
        }
        return Ok(ExitCode::SUCCESS);
    }
    if scenarios.is_empty() {
        anyhow::bail!("no scenario matches the filter");
    }

    let report = run_all(config, &scenarios).await?;
    println!("{}", report);

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
