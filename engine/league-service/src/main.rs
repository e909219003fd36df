//! League Service
//!
//! Runs the scheduled waiver resolver over the journaled league store, and
//! offers one-shot commands for seeding leagues and forcing a waiver run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use league_service::{
    graceful_shutdown, import, initialize_logging, load_configuration, setup_signal_handlers,
    wait_for_shutdown, LeagueSeed, ServiceState,
};

#[derive(Parser)]
#[command(name = "league-service")]
#[command(about = "Dynasty league roster transaction service")]
#[command(version)]
struct Cli {
    /// TOML configuration file; LEAGUE_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the waiver scheduler until interrupted (default)
    Run,
    /// Import a league seed file
    Import {
        /// JSON seed file
        file: PathBuf,
    },
    /// Resolve pending claims once and exit
    Resolve {
        /// Ignore bidding windows
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = load_configuration(cli.config.as_deref())?;
    let _log_guard = initialize_logging(&config.logging)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Import { file } => {
            let seed = LeagueSeed::from_file(&file)?;
            let state = ServiceState::new(config).await?;
            let summary = import(state.store.as_ref(), &seed).await?;
            state.shutdown()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Resolve { force } => {
            let state = ServiceState::new(config).await?;
            let reports = state.run_waivers_once(force).await?;
            state.shutdown()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }
        Command::PrintConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn run(config: league_service::ServiceConfig) -> Result<()> {
    info!("Starting League Service v{}", env!("CARGO_PKG_VERSION"));

    let service_state = Arc::new(ServiceState::new(config).await?);
    info!("Service state initialized");

    let shutdown = setup_signal_handlers().context("Failed to set up signal handlers")?;
    info!("Signal handlers configured");

    let scheduler_handle = {
        let state = service_state.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { state.run_scheduler(shutdown).await })
    };

    info!("League Service is running. Press Ctrl+C to shutdown gracefully.");
    let mut shutdown = shutdown;
    wait_for_shutdown(&mut shutdown).await;

    info!("Shutdown signal received. Initiating graceful shutdown...");
    if let Err(e) = graceful_shutdown(service_state, scheduler_handle).await {
        error!("Graceful shutdown failed: {:#}", e);
        return Err(e);
    }

    info!("League Service shutdown complete");
    Ok(())
}
