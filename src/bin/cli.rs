//! regsync CLI
//!
//! Local execution entry point. The periodic scheduler and any cold-start
//! hook both simply invoke `regsync sync`; the day-guard makes repeated
//! invocations safe.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use regsync::{
    config::load_config,
    error::Result,
    pipeline::SyncEngine,
    storage::{LocalStore, MetricsStore},
};

/// regsync - Regulatory Corpus Sync Engine
#[derive(Parser, Debug)]
#[command(name = "regsync", version, about = "Regulatory corpus sync and metrics engine")]
struct Cli {
    /// Path to the data directory containing config and stored collections
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one synchronization pass
    Sync,

    /// Validate configuration files
    Validate,

    /// Show current snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("regsync starting...");

    let config_path = cli.data_dir.join("config.toml");
    let mut config = load_config(&config_path)?;
    config.storage.data_dir = cli.data_dir.clone();

    let config = Arc::new(config);
    let store = LocalStore::new(&config.storage.data_dir);

    match cli.command {
        Command::Sync => {
            config.validate()?;
            let engine = SyncEngine::new(Arc::clone(&config))?;
            let report = engine.run_sync_pass(&store).await?;

            log::info!(
                "{} titles and {} agencies synchronized",
                report.titles_processed,
                report.agencies_processed
            );
            if report.used_fallback {
                log::warn!("pass completed on the fallback path; stored data is synthetic");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Data directory: {}", cli.data_dir.display());

            let titles = store.find_all_titles().await?;
            let agencies = store.find_all_agencies().await?;
            log::info!("Titles: {}, agencies: {}", titles.len(), agencies.len());

            match store.latest_snapshot().await? {
                Some(snapshot) => {
                    log::info!(
                        "Latest snapshot: {} ({} words across {} titles, {} changes)",
                        snapshot.date,
                        snapshot.total_word_count,
                        snapshot.title_counts.len(),
                        snapshot.changes.len()
                    );
                }
                None => log::info!("No snapshot found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
