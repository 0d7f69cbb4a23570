//! Betting ledger core
//!
//! Pure money math plus the batch passes that move events and bets through
//! their lifecycles. Everything here talks to storage only through
//! [`crate::store::LedgerStore`].

pub mod bets;
pub mod lifecycle;
pub mod math;
pub mod outcomes;
pub mod settlement;
pub mod simulation;

pub use bets::{get_user_bet, list_user_bets, place_bet, user_stats, BetListStatus, BetPage, PlaceBet};
pub use lifecycle::{derive_status, LifecycleController, LifecycleReport};
pub use outcomes::{resolve_completed_events, OutcomeReport};
pub use settlement::{settle_bet, settle_pending_bets, SettledBet, SettlementReport, UnresolvableBet};
pub use simulation::{run_cycle, spawn_simulation_timer, CycleSummary, SimulationRunner};
