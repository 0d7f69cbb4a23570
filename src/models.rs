//! Ledger Data Model
//! Events, markets, selections, bets and users as persisted by the ledger store

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Every event is assumed to run for this long after its start time.
pub const EVENT_DURATION_HOURS: i64 = 2;

pub fn event_duration() -> Duration {
    Duration::hours(EVENT_DURATION_HOURS)
}

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Live,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Live => "live",
            EventStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "upcoming" => Some(EventStatus::Upcoming),
            "live" => Some(EventStatus::Live),
            "completed" => Some(EventStatus::Completed),
            _ => None,
        }
    }

    /// Position in the lifecycle. Status only ever moves to a higher rank.
    pub fn rank(&self) -> u8 {
        match self {
            EventStatus::Upcoming => 0,
            EventStatus::Live => 1,
            EventStatus::Completed => 2,
        }
    }
}

/// Result carried by a selection once its event has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionResult {
    Win,
    Loss,
}

/// A single backable outcome within a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,
    pub name: String,
    pub odds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SelectionResult>,
}

impl Selection {
    pub fn new(id: impl Into<String>, name: impl Into<String>, odds: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            odds,
            result: None,
        }
    }
}

/// A named group of mutually exclusive selections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub name: String,
    pub selections: Vec<Selection>,
}

impl Market {
    /// A market counts as resolved as soon as any selection carries a result.
    pub fn is_resolved(&self) -> bool {
        self.selections.iter().any(|s| s.result.is_some())
    }

    pub fn winner(&self) -> Option<&Selection> {
        self.selections
            .iter()
            .find(|s| s.result == Some(SelectionResult::Win))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub sport_type: String,
    pub competition: String,
    pub start_time: DateTime<Utc>,
    pub status: EventStatus,
    pub markets: Vec<Market>,
}

impl Event {
    /// Implicit end of the event: start time plus the fixed duration.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + event_duration()
    }

    pub fn find_selection(&self, selection_id: &str) -> Option<(&Market, &Selection)> {
        self.markets.iter().find_map(|m| {
            m.selections
                .iter()
                .find(|s| s.id == selection_id)
                .map(|s| (m, s))
        })
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.markets.iter().all(Market::is_resolved)
    }
}

/// Bet status. `Settled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Placed,
    Settled,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Placed => "placed",
            BetStatus::Settled => "settled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "placed" => Some(BetStatus::Placed),
            "settled" => Some(BetStatus::Settled),
            _ => None,
        }
    }
}

/// Final result of a settled bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOutcome {
    Win,
    Loss,
    Void,
    HalfWin,
    HalfLoss,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::Win => "win",
            BetOutcome::Loss => "loss",
            BetOutcome::Void => "void",
            BetOutcome::HalfWin => "half_win",
            BetOutcome::HalfLoss => "half_loss",
        }
    }

    /// Exact match only; anything outside the five recognised values is rejected.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "win" => Some(BetOutcome::Win),
            "loss" => Some(BetOutcome::Loss),
            "void" => Some(BetOutcome::Void),
            "half_win" => Some(BetOutcome::HalfWin),
            "half_loss" => Some(BetOutcome::HalfLoss),
            _ => None,
        }
    }
}

impl From<SelectionResult> for BetOutcome {
    fn from(result: SelectionResult) -> Self {
        match result {
            SelectionResult::Win => BetOutcome::Win,
            SelectionResult::Loss => BetOutcome::Loss,
        }
    }
}

/// Commission metadata stored with each bet (informational, not deducted)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub standard: f64,
    pub ai_premium: f64,
    pub profit_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    pub selection_id: String,
    // Snapshot taken at placement; never re-read from the event
    pub event_name: String,
    pub selection_name: String,
    pub odds: f64,
    pub estimated_result_time: DateTime<Utc>,
    pub stake_amount: f64,
    pub currency: String,
    pub potential_return: f64,
    pub commission: Commission,
    pub status: BetStatus,
    pub result: Option<BetOutcome>,
    pub created_at: DateTime<Utc>,
    pub used_ai_recommendation: bool,
}

impl Bet {
    pub fn is_settled(&self) -> bool {
        self.status == BetStatus::Settled
    }
}

/// Ledger user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub credential: String, // bcrypt hash, empty for externally verified identities
    pub created_at: DateTime<Utc>,
}

/// Filter for event scans
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Empty means any status
    pub statuses: Vec<EventStatus>,
    pub starts_from: Option<DateTime<Utc>>,
    pub starts_until: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn with_statuses(statuses: &[EventStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Default::default()
        }
    }
}

/// Filter for bet scans. Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct BetFilter {
    pub user_id: Option<String>,
    pub status: Option<BetStatus>,
    pub limit: Option<usize>,
    pub offset: usize,
}
