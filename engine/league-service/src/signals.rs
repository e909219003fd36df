//! Signal handling for graceful shutdown

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::service::ServiceState;

/// Setup signal handlers for graceful shutdown
///
/// The returned receiver flips to `true` on the first SIGINT or SIGTERM.
pub fn setup_signal_handlers() -> Result<watch::Receiver<bool>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Handle Ctrl+C (SIGINT)
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C signal: {}", e);
            return;
        }
        info!("Ctrl+C signal received");
        let _ = ctrl_c_tx.send(true);
    });

    // Handle SIGTERM (Unix only)
    #[cfg(unix)]
    {
        use signal_hook::consts::SIGTERM;

        let sigterm = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(SIGTERM, sigterm.clone())
            .context("Failed to register SIGTERM handler")?;

        tokio::spawn(async move {
            while !sigterm.load(Ordering::Relaxed) {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
            info!("SIGTERM signal received");
            let _ = shutdown_tx.send(true);
        });
    }

    Ok(shutdown_rx)
}

/// Wait until shutdown is requested
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Graceful shutdown handler
pub async fn graceful_shutdown(
    service_state: Arc<ServiceState>,
    scheduler_handle: JoinHandle<()>,
) -> Result<()> {
    info!("Starting graceful shutdown...");

    match timeout(service_state.config.shutdown_timeout(), scheduler_handle).await {
        Ok(Ok(())) => info!("Waiver scheduler stopped gracefully"),
        Ok(Err(e)) => error!("Waiver scheduler task failed: {}", e),
        Err(_) => warn!("Waiver scheduler did not stop within timeout, forcing shutdown"),
    }

    service_state.shutdown().context("Failed to shut down service components")?;

    info!("Graceful shutdown complete");
    Ok(())
}
