//! League Service
//!
//! Hosts the transaction engine over a journaled store: configuration,
//! logging, league seed import, the scheduled waiver run and graceful
//! shutdown.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod seed;
pub mod service;
pub mod signals;

#[cfg(test)]
mod tests;

pub use config::ServiceConfig;
pub use logging::initialize_logging;
pub use seed::{import, ImportSummary, LeagueSeed};
pub use service::ServiceState;
pub use signals::{graceful_shutdown, setup_signal_handlers, wait_for_shutdown};

/// Load configuration from an optional file and environment variables
pub fn load_configuration(file: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(file).context("Failed to load service configuration")
}
