//! Error types for the roster ledger

use crate::money::Salary;
use crate::types::{PlayerId, SlotCategory, TeamId};
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a `LeagueStore`
#[derive(Error, Debug)]
pub enum StoreError {
    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A commit guard no longer holds; nothing was written
    #[error("Commit conflict: {0}")]
    Conflict(String),

    /// Invalid operation for the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O errors from a durable backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable data could not be read back
    #[error("Data corruption: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Create a new not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a new corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Roster projection failures; these surface as rejected claims
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("player {player} cannot be placed on team {team}: {reason}")]
    InvalidPlayer { team: TeamId, player: PlayerId, reason: String },

    #[error("no {slot} slots available for team {team} ({count}/{limit})")]
    SlotExceeded { team: TeamId, slot: SlotCategory, count: usize, limit: usize },

    #[error("team {team} would exceed the salary cap ({used} of {cap})")]
    CapExceeded { team: TeamId, used: Salary, cap: Salary },
}

impl ProjectionError {
    pub fn invalid_player(team: TeamId, player: PlayerId, reason: impl Into<String>) -> Self {
        Self::InvalidPlayer { team, player, reason: reason.into() }
    }
}
