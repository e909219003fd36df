//! Roster Ledger - league model, append-only transaction ledger and roster projection
//!
//! This crate holds the data every other engine crate works on:
//!
//! - **types**: players, teams, ledger entries, claims, trades and draft picks
//! - **config**: per-league cap, slot limits and season calendar
//! - **store**: the `LeagueStore` backend trait with guarded atomic commits
//! - **projector**: roster and cap state recomputed from the ledger

pub mod config;
pub mod error;
pub mod money;
pub mod projector;
pub mod store;
pub mod types;

pub use config::{DraftSettings, DraftType, LeagueConfig, SeasonCalendar, SlotLimits, TimeWindow};
pub use error::{ProjectionError, Result, StoreError};
pub use money::Salary;
pub use projector::{project_league, Holding, LeagueProjection, RosterProjection, RosterRules};
pub use store::{
    Applied, AssignmentReplacement, ClaimFilter, ClaimResolution, ClaimUpdate, CommitBatch, Guard,
    InMemoryStore, LeagueStore, PickUpdate, StoreMutation, TradeUpdate,
};
pub use types::*;
