//! Ledger Store
//! Mission: Durable keyed storage for events, bets and users
//!
//! The core only talks to storage through [`LedgerStore`]. Every mutating call
//! is atomic per record and guarded so that concurrent passes converge:
//! - event status only ever moves forward
//! - a market that already carries a result is never overwritten
//! - a bet is settled by at most one caller

pub mod seed;
pub mod sqlite;

pub use sqlite::SqliteLedgerStore;

use crate::error::LedgerResult;
use crate::models::{Bet, BetFilter, BetOutcome, Event, EventFilter, EventStatus, Market, User};

pub trait LedgerStore: Send + Sync {
    /// Insert a new event and index its selections.
    fn insert_event(&self, event: &Event) -> LedgerResult<()>;

    fn get_event(&self, id: &str) -> LedgerResult<Option<Event>>;

    /// Events matching the filter, ordered by start time.
    fn scan_events(&self, filter: &EventFilter) -> LedgerResult<Vec<Event>>;

    fn count_events(&self) -> LedgerResult<usize>;

    /// Move an event forward to `status`. Returns `false` when the event is
    /// already at or past that status, `NotFound` when it does not exist.
    fn update_event_status(&self, id: &str, status: EventStatus) -> LedgerResult<bool>;

    /// Write market results for an event. Markets that already carry a result
    /// in the store are left untouched. Returns the number of markets written.
    fn update_event_markets(&self, id: &str, markets: &[Market]) -> LedgerResult<usize>;

    /// Event containing the given selection, resolved through the selection index.
    fn find_selection_event(&self, selection_id: &str) -> LedgerResult<Option<Event>>;

    fn insert_bet(&self, bet: &Bet) -> LedgerResult<()>;

    fn get_bet(&self, id: &str) -> LedgerResult<Option<Bet>>;

    fn scan_bets(&self, filter: &BetFilter) -> LedgerResult<Vec<Bet>>;

    /// Number of bets matching the filter, ignoring limit and offset.
    fn count_bets(&self, filter: &BetFilter) -> LedgerResult<usize>;

    /// Settle a placed bet with `result`. Returns `true` only for the call that
    /// performed the transition; an already settled bet is left unchanged.
    fn update_bet_settlement(&self, id: &str, result: BetOutcome) -> LedgerResult<bool>;

    fn get_user_by_username(&self, username: &str) -> LedgerResult<Option<User>>;

    /// Return the user with `username`, creating it with `credential` if unseen.
    fn get_or_create_user(&self, username: &str, credential: &str) -> LedgerResult<User>;
}
