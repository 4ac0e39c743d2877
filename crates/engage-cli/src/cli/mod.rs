//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use engage_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "engage")]
#[command(version)]
#[command(about = "AI character engagement analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List characters available for analysis
    Characters,
    /// List preset news scenarios
    Scenarios,
    /// Run an engagement analysis and stream results
    Analyze {
        /// Custom news text to analyze
        #[arg(long, conflicts_with = "scenario")]
        news: Option<String>,

        /// Id of a preset scenario to analyze
        #[arg(long)]
        scenario: Option<String>,

        /// Comma-separated character ids
        #[arg(long, value_name = "IDS")]
        characters: String,

        /// Retry once before giving up if the analysis fails
        #[arg(long = "retry-once")]
        retry_once: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Logging goes to stderr under `ENGAGE_LOG` (off by default) so stdout
/// stays clean for rendered results.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("ENGAGE_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    match cli.command {
        Commands::Characters => commands::characters::run(&config).await,
        Commands::Scenarios => commands::scenarios::run(&config).await,
        Commands::Analyze {
            news,
            scenario,
            characters,
            retry_once,
        } => {
            commands::analyze::run(commands::analyze::AnalyzeOptions {
                config: &config,
                news: news.as_deref(),
                scenario: scenario.as_deref(),
                characters: &characters,
                retry_once,
            })
            .await
        }
    }
}
