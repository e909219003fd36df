//! Claim Engine - roster transaction processing for dynasty leagues
//!
//! This crate turns team requests into guarded ledger commits:
//!
//! - **validator**: admission checks for waiver, poach and transition claims
//! - **resolver**: priority/bid arbitration of pending claims
//! - **trade**: trade proposals and atomic acceptance
//! - **draft**: rookie draft turn order and selections
//! - **moves**: releases, slot moves and free-agent signings
//! - **engine**: the `TransactionEngine` facade tying them to a `LeagueStore`
//!
//! Every decision is made against a fresh [`LeagueSnapshot`] under per-resource
//! locks and committed as one batch whose guards the store re-checks.

pub mod auth;
pub mod draft;
pub mod effects;
pub mod engine;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod moves;
pub mod notify;
pub mod resolver;
pub mod snapshot;
pub mod trade;
pub mod validator;

#[cfg(test)]
mod testing;

pub use auth::Actor;
pub use effects::Effect;
pub use engine::TransactionEngine;
pub use error::{EngineError, Rejection, Result};
pub use locks::{Resource, ResourceLocks};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use notify::{
    Broadcaster, ChannelBroadcaster, LeagueEvent, LogNotifier, Notification, NotificationKind,
    Notifier, NotifyError,
};
pub use resolver::WaiverReport;
pub use snapshot::LeagueSnapshot;
pub use trade::TradeOffer;
pub use validator::{ClaimRequest, ValidatedClaim, ValidationMode};
