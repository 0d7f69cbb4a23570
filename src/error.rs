//! Ledger error taxonomy

use std::fmt;

/// Result type for ledger and store operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Kind of record a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Event,
    Bet,
    Selection,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Event => "event",
            EntityKind::Bet => "bet",
            EntityKind::Selection => "selection",
            EntityKind::User => "user",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    #[error("invalid stake: {0}")]
    InvalidStake(f64),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("bet {bet_id} belongs to another user")]
    Forbidden { bet_id: String },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Failures scoped to a single record. Batch passes skip these and keep
    /// going; anything else aborts the pass.
    pub fn is_per_entity(&self) -> bool {
        matches!(
            self,
            LedgerError::NotFound { .. } | LedgerError::Corrupt(_) | LedgerError::Codec(_)
        )
    }
}
