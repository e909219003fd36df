//! # Eligibility Clock
//!
//! Time-windowed gates for claims, trades and the rookie draft: the league
//! week, waiver periods, free agency, sanctuary and poach windows, the trade
//! deadline and the restricted free agency period.
//!
//! Time is always read from an injected [`Clock`], never from global state.

pub mod clock;
pub mod error;
pub mod windows;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ClockError;
pub use windows::{EligibilityClock, PoachWindow};
