//! Error types for the eligibility clock

use thiserror::Error;

/// Errors that can occur building an `EligibilityClock`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("Configuration error: {0}")]
    Config(String),
}
