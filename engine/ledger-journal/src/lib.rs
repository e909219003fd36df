//! # Ledger Journal
//!
//! Durable storage for the league store. Every `StoreMutation` is appended to
//! a JSON-lines write-ahead journal after its guards pass and before it is
//! applied in memory; opening the store replays the journal.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledger_journal::{JournalConfig, JournaledStore};
//! use roster_ledger::LeagueStore;
//!
//! # async fn run() -> roster_ledger::Result<()> {
//! let store = JournaledStore::open(JournalConfig::new("./data")).await?;
//! let leagues = store.leagues().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod journal;
pub mod store;

#[cfg(test)]
mod tests;

pub use config::JournalConfig;
pub use journal::{read_entries, Journal, JournalEntry};
pub use store::JournaledStore;
