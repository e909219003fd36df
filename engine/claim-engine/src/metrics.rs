// Metrics collection for the transaction engine

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe atomic counter
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counters for claims, trades, picks and commits
#[derive(Debug)]
pub struct EngineMetrics {
    // Claims
    pub claims_submitted: AtomicCounter,
    pub claims_rejected: AtomicCounter,
    pub claims_cancelled: AtomicCounter,
    pub claims_won: AtomicCounter,
    pub claims_lost: AtomicCounter,

    // Trades
    pub trades_proposed: AtomicCounter,
    pub trades_accepted: AtomicCounter,
    pub trades_closed: AtomicCounter,

    // Draft and roster moves
    pub picks_made: AtomicCounter,
    pub roster_moves: AtomicCounter,

    // Resolution
    pub waiver_runs: AtomicCounter,
    pub commit_conflicts: AtomicCounter,

    started_at: Instant,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub claims_submitted: u64,
    pub claims_rejected: u64,
    pub claims_cancelled: u64,
    pub claims_won: u64,
    pub claims_lost: u64,
    pub trades_proposed: u64,
    pub trades_accepted: u64,
    pub trades_closed: u64,
    pub picks_made: u64,
    pub roster_moves: u64,
    pub waiver_runs: u64,
    pub commit_conflicts: u64,
    pub uptime_secs: u64,
}

impl EngineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            claims_submitted: AtomicCounter::new(),
            claims_rejected: AtomicCounter::new(),
            claims_cancelled: AtomicCounter::new(),
            claims_won: AtomicCounter::new(),
            claims_lost: AtomicCounter::new(),
            trades_proposed: AtomicCounter::new(),
            trades_accepted: AtomicCounter::new(),
            trades_closed: AtomicCounter::new(),
            picks_made: AtomicCounter::new(),
            roster_moves: AtomicCounter::new(),
            waiver_runs: AtomicCounter::new(),
            commit_conflicts: AtomicCounter::new(),
            started_at: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            claims_submitted: self.claims_submitted.get(),
            claims_rejected: self.claims_rejected.get(),
            claims_cancelled: self.claims_cancelled.get(),
            claims_won: self.claims_won.get(),
            claims_lost: self.claims_lost.get(),
            trades_proposed: self.trades_proposed.get(),
            trades_accepted: self.trades_accepted.get(),
            trades_closed: self.trades_closed.get(),
            picks_made: self.picks_made.get(),
            roster_moves: self.roster_moves.get(),
            waiver_runs: self.waiver_runs.get(),
            commit_conflicts: self.commit_conflicts.get(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_in_snapshot() {
        let metrics = EngineMetrics::new();
        metrics.claims_submitted.inc();
        metrics.claims_submitted.inc();
        metrics.claims_lost.add(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.claims_submitted, 2);
        assert_eq!(snapshot.claims_lost, 3);
        assert_eq!(snapshot.trades_accepted, 0);
    }
}
