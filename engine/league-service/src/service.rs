//! Service state management and component initialization

use anyhow::{Context, Result};
use claim_engine::{ChannelBroadcaster, TransactionEngine, WaiverReport};
use eligibility_clock::{Clock, SystemClock};
use ledger_journal::JournaledStore;
use roster_ledger::{ClaimKind, LeagueStore};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;

/// Service state containing all initialized components
pub struct ServiceState {
    /// Service configuration
    pub config: ServiceConfig,

    /// Journaled league store
    pub store: Arc<JournaledStore>,

    /// League event channel shared with the engine
    pub broadcaster: ChannelBroadcaster,

    /// Transaction engine over the store
    pub engine: Arc<TransactionEngine>,
}

impl ServiceState {
    /// Create a new service state on the wall clock
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        Self::new_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn new_with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        info!("Initializing service components...");

        if !config.service.data_dir.exists() {
            std::fs::create_dir_all(&config.service.data_dir)
                .context("Failed to create data directory")?;
        }

        info!("Opening league journal in {:?}...", config.service.data_dir);
        let store = Arc::new(
            JournaledStore::open(config.journal_config())
                .await
                .context("Failed to open league journal")?,
        );

        let broadcaster = ChannelBroadcaster::new(config.service.broadcast_capacity);
        let engine = TransactionEngine::new(store.clone(), clock)
            .with_broadcaster(Arc::new(broadcaster.clone()));

        info!("Service components initialized");
        Ok(Self { config, store, broadcaster, engine: Arc::new(engine) })
    }

    /// Resolve ready claims of every kind in every league
    ///
    /// A failing league or claim kind is logged and skipped.
    pub async fn run_waivers_once(&self, force: bool) -> Result<Vec<WaiverReport>> {
        let leagues = self.store.leagues().await.context("Failed to list leagues")?;
        let mut reports = Vec::new();

        for league in leagues {
            for kind in ClaimKind::ALL {
                match self.engine.run_waivers(league, kind, force).await {
                    Ok(report) => {
                        if report.settled_any() {
                            reports.push(report);
                        }
                    }
                    Err(e) => error!(league, kind = %kind, "waiver run failed: {}", e),
                }
            }
        }

        let metrics = self.engine.metrics();
        debug!(?metrics, "engine metrics");
        info!(
            settled_groups = reports.len(),
            claims_won = metrics.claims_won,
            claims_lost = metrics.claims_lost,
            "waiver run complete"
        );
        Ok(reports)
    }

    /// Run waivers on the configured interval until shutdown is requested
    pub async fn run_scheduler(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.waiver_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.service.waiver_run_interval_secs,
            "Waiver scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_waivers_once(false).await {
                        error!("Scheduled waiver run failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed");
                        break;
                    }
                }
            }
        }

        info!("Waiver scheduler stopped");
    }

    /// Flush the journal
    pub fn shutdown(&self) -> Result<()> {
        info!("Flushing league journal...");
        self.store.flush().context("Failed to flush league journal")?;
        Ok(())
    }
}
