//! WorldBet Ledger Library
//!
//! Sports-betting ledger: event lifecycle, synthetic outcome generation,
//! exactly-once bet settlement and per-user profit statistics, backed by
//! SQLite and exposed over HTTP by the `worldbet` binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod store;

pub use error::{LedgerError, LedgerResult};
