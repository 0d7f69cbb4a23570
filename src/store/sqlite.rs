//! SQLite Ledger Store
//!
//! Single connection behind a mutex, WAL journal. Markets are stored as JSON on
//! the event row and a `selection_index` table maps each selection id to its
//! event so bets resolve with a point lookup instead of a full scan.

use crate::error::{EntityKind, LedgerError, LedgerResult};
use crate::models::{
    Bet, BetFilter, BetOutcome, BetStatus, Commission, Event, EventFilter, EventStatus, Market,
    User,
};
use crate::store::LedgerStore;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sport_type TEXT NOT NULL,
    competition TEXT NOT NULL,
    start_time_ms INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'upcoming',
    markets_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_status_start
    ON events(status, start_time_ms);

CREATE TABLE IF NOT EXISTS selection_index (
    selection_id TEXT PRIMARY KEY,
    event_id TEXT NOT NULL,
    market_id TEXT NOT NULL,
    FOREIGN KEY (event_id) REFERENCES events(id)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    credential TEXT NOT NULL DEFAULT '',
    created_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bets (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    selection_id TEXT NOT NULL,
    event_name TEXT NOT NULL,
    selection_name TEXT NOT NULL,
    odds REAL NOT NULL,
    estimated_result_ms INTEGER NOT NULL,
    stake_amount REAL NOT NULL,
    currency TEXT NOT NULL,
    potential_return REAL NOT NULL,
    commission_json TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'placed',
    result TEXT,
    created_at_ms INTEGER NOT NULL,
    used_ai_recommendation INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_bets_user_created
    ON bets(user_id, created_at_ms DESC);

CREATE INDEX IF NOT EXISTS idx_bets_status
    ON bets(status);
"#;

const EVENT_COLUMNS: &str =
    "e.id, e.name, e.sport_type, e.competition, e.start_time_ms, e.status, e.markets_json";

const BET_COLUMNS: &str = "id, user_id, selection_id, event_name, selection_name, odds, \
     estimated_result_ms, stake_amount, currency, potential_return, commission_json, status, \
     result, created_at_ms, used_ai_recommendation";

// Lifecycle rank of the stored status, kept in step with EventStatus::rank
const STATUS_RANK_SQL: &str =
    "(CASE status WHEN 'upcoming' THEN 0 WHEN 'live' THEN 1 ELSE 2 END)";

pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
}

impl SqliteLedgerStore {
    /// Open (or create) a ledger database at `db_path`.
    pub fn open(db_path: &str) -> LedgerResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self::from_connection(conn)?;
        info!("📒 Ledger store opened at {}", db_path);
        Ok(store)
    }

    pub fn in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> LedgerResult<Self> {
        // Other processes may hold the write lock during their own pass
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn insert_event(&self, event: &Event) -> LedgerResult<()> {
        let markets_json = serde_json::to_string(&event.markets)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        // Selection ids are unique across the ledger
        let mut seen = HashSet::new();
        {
            let mut owner_stmt =
                tx.prepare_cached("SELECT event_id FROM selection_index WHERE selection_id = ?1")?;
            for selection in event.markets.iter().flat_map(|m| &m.selections) {
                if !seen.insert(selection.id.as_str()) {
                    return Err(LedgerError::InvalidRequest(format!(
                        "selection {} appears twice in event {}",
                        selection.id, event.id
                    )));
                }
                let owner: Option<String> = owner_stmt
                    .query_row(params![selection.id], |row| row.get(0))
                    .optional()?;
                if let Some(owner) = owner {
                    return Err(LedgerError::InvalidRequest(format!(
                        "selection {} already belongs to event {}",
                        selection.id, owner
                    )));
                }
            }
        }

        tx.execute(
            "INSERT INTO events (id, name, sport_type, competition, start_time_ms, status, markets_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.id,
                event.name,
                event.sport_type,
                event.competition,
                event.start_time.timestamp_millis(),
                event.status.as_str(),
                markets_json,
            ],
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO selection_index (selection_id, event_id, market_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for market in &event.markets {
                for selection in &market.selections {
                    stmt.execute(params![selection.id, event.id, market.id])?;
                }
            }
        }

        tx.commit()?;
        debug!(event_id = %event.id, "Inserted event {}", event.name);
        Ok(())
    }

    fn get_event(&self, id: &str) -> LedgerResult<Option<Event>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = ?1");
        let row = conn
            .query_row(&sql, params![id], EventRow::from_row)
            .optional()?;
        row.map(EventRow::into_event).transpose()
    }

    fn scan_events(&self, filter: &EventFilter) -> LedgerResult<Vec<Event>> {
        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE 1=1");
        let mut values: Vec<Value> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            sql.push_str(&format!(" AND e.status IN ({placeholders})"));
            values.extend(
                filter
                    .statuses
                    .iter()
                    .map(|s| Value::Text(s.as_str().to_string())),
            );
        }
        if let Some(from) = filter.starts_from {
            sql.push_str(" AND e.start_time_ms >= ?");
            values.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(until) = filter.starts_until {
            sql.push_str(" AND e.start_time_ms <= ?");
            values.push(Value::Integer(until.timestamp_millis()));
        }
        sql.push_str(" ORDER BY e.start_time_ms ASC, e.id ASC");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), EventRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decode_rows(rows, EventRow::into_event))
    }

    fn count_events(&self) -> LedgerResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn update_event_status(&self, id: &str, status: EventStatus) -> LedgerResult<bool> {
        let conn = self.conn.lock();
        let sql = format!(
            "UPDATE events SET status = ?1 WHERE id = ?2 AND {STATUS_RANK_SQL} < ?3"
        );
        let changed = conn.execute(&sql, params![status.as_str(), id, status.rank()])?;
        if changed > 0 {
            return Ok(true);
        }

        if exists(&conn, "SELECT 1 FROM events WHERE id = ?1", id)? {
            Ok(false)
        } else {
            Err(LedgerError::not_found(EntityKind::Event, id))
        }
    }

    fn update_event_markets(&self, id: &str, markets: &[Market]) -> LedgerResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored_json: String = tx
            .query_row(
                "SELECT markets_json FROM events WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Event, id))?;
        let mut stored: Vec<Market> = serde_json::from_str(&stored_json)?;

        // Only selection results are taken from the incoming markets; odds stay as placed
        let mut written = 0;
        for slot in stored.iter_mut().filter(|m| !m.is_resolved()) {
            let Some(incoming) = markets.iter().find(|m| m.id == slot.id && m.is_resolved()) else {
                continue;
            };
            for selection in slot.selections.iter_mut() {
                selection.result = incoming
                    .selections
                    .iter()
                    .find(|s| s.id == selection.id)
                    .and_then(|s| s.result);
            }
            if slot.is_resolved() {
                written += 1;
            }
        }

        if written > 0 {
            tx.execute(
                "UPDATE events SET markets_json = ?1 WHERE id = ?2",
                params![serde_json::to_string(&stored)?, id],
            )?;
        }
        tx.commit()?;
        Ok(written)
    }

    fn find_selection_event(&self, selection_id: &str) -> LedgerResult<Option<Event>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM selection_index s
             JOIN events e ON e.id = s.event_id
             WHERE s.selection_id = ?1"
        );
        let row = conn
            .query_row(&sql, params![selection_id], EventRow::from_row)
            .optional()?;
        row.map(EventRow::into_event).transpose()
    }

    fn insert_bet(&self, bet: &Bet) -> LedgerResult<()> {
        let commission_json = serde_json::to_string(&bet.commission)?;
        let conn = self.conn.lock();
        let sql = format!(
            "INSERT INTO bets ({BET_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        );
        conn.execute(
            &sql,
            params![
                bet.id,
                bet.user_id,
                bet.selection_id,
                bet.event_name,
                bet.selection_name,
                bet.odds,
                bet.estimated_result_time.timestamp_millis(),
                bet.stake_amount,
                bet.currency,
                bet.potential_return,
                commission_json,
                bet.status.as_str(),
                bet.result.map(|r| r.as_str()),
                bet.created_at.timestamp_millis(),
                bet.used_ai_recommendation,
            ],
        )?;
        Ok(())
    }

    fn get_bet(&self, id: &str) -> LedgerResult<Option<Bet>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {BET_COLUMNS} FROM bets WHERE id = ?1");
        let row = conn
            .query_row(&sql, params![id], BetRow::from_row)
            .optional()?;
        row.map(BetRow::into_bet).transpose()
    }

    fn scan_bets(&self, filter: &BetFilter) -> LedgerResult<Vec<Bet>> {
        let (where_sql, mut values) = bet_filter_sql(filter);
        let mut sql =
            format!("SELECT {BET_COLUMNS} FROM bets{where_sql} ORDER BY created_at_ms DESC, id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(limit as i64));
            values.push(Value::Integer(filter.offset as i64));
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), BetRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decode_rows(rows, BetRow::into_bet))
    }

    fn count_bets(&self, filter: &BetFilter) -> LedgerResult<usize> {
        let (where_sql, values) = bet_filter_sql(filter);
        let sql = format!("SELECT COUNT(*) FROM bets{where_sql}");
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn update_bet_settlement(&self, id: &str, result: BetOutcome) -> LedgerResult<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE bets SET status = ?1, result = ?2 WHERE id = ?3 AND status = ?4",
            params![
                BetStatus::Settled.as_str(),
                result.as_str(),
                id,
                BetStatus::Placed.as_str(),
            ],
        )?;
        if changed > 0 {
            return Ok(true);
        }

        if exists(&conn, "SELECT 1 FROM bets WHERE id = ?1", id)? {
            Ok(false)
        } else {
            Err(LedgerError::not_found(EntityKind::Bet, id))
        }
    }

    fn get_user_by_username(&self, username: &str) -> LedgerResult<Option<User>> {
        let conn = self.conn.lock();
        select_user(&conn, username)
    }

    fn get_or_create_user(&self, username: &str, credential: &str) -> LedgerResult<User> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, username, credential, created_at_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                username,
                credential,
                Utc::now().timestamp_millis(),
            ],
        )?;
        if inserted > 0 {
            info!("✅ Created user: {}", username);
        }

        select_user(&conn, username)?
            .ok_or_else(|| LedgerError::not_found(EntityKind::User, username))
    }
}

fn exists(conn: &Connection, sql: &str, id: &str) -> LedgerResult<bool> {
    let found: Option<i64> = conn.query_row(sql, params![id], |row| row.get(0)).optional()?;
    Ok(found.is_some())
}

fn select_user(conn: &Connection, username: &str) -> LedgerResult<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, credential, created_at_ms FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, username, credential, created_at_ms)| {
        Ok(User {
            id,
            username,
            credential,
            created_at: timestamp(created_at_ms)?,
        })
    })
    .transpose()
}

/// Decode scanned rows, skipping records that fail to decode so one bad row
/// does not hide every other record from a pass.
fn decode_rows<R, T>(rows: Vec<R>, decode: impl Fn(R) -> LedgerResult<T>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable record: {}", e);
                None
            }
        })
        .collect()
}

fn bet_filter_sql(filter: &BetFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(user_id) = &filter.user_id {
        clauses.push("user_id = ?");
        values.push(Value::Text(user_id.clone()));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn timestamp(ms: i64) -> LedgerResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| LedgerError::Corrupt(format!("timestamp out of range: {ms}")))
}

/// Raw event columns, decoded outside the rusqlite row callback
struct EventRow {
    id: String,
    name: String,
    sport_type: String,
    competition: String,
    start_time_ms: i64,
    status: String,
    markets_json: String,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            sport_type: row.get(2)?,
            competition: row.get(3)?,
            start_time_ms: row.get(4)?,
            status: row.get(5)?,
            markets_json: row.get(6)?,
        })
    }

    fn into_event(self) -> LedgerResult<Event> {
        let status = EventStatus::from_str(&self.status).ok_or_else(|| {
            LedgerError::Corrupt(format!("event {} has status {}", self.id, self.status))
        })?;
        Ok(Event {
            start_time: timestamp(self.start_time_ms)?,
            markets: serde_json::from_str(&self.markets_json)?,
            id: self.id,
            name: self.name,
            sport_type: self.sport_type,
            competition: self.competition,
            status,
        })
    }
}

struct BetRow {
    id: String,
    user_id: String,
    selection_id: String,
    event_name: String,
    selection_name: String,
    odds: f64,
    estimated_result_ms: i64,
    stake_amount: f64,
    currency: String,
    potential_return: f64,
    commission_json: String,
    status: String,
    result: Option<String>,
    created_at_ms: i64,
    used_ai_recommendation: bool,
}

impl BetRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            selection_id: row.get(2)?,
            event_name: row.get(3)?,
            selection_name: row.get(4)?,
            odds: row.get(5)?,
            estimated_result_ms: row.get(6)?,
            stake_amount: row.get(7)?,
            currency: row.get(8)?,
            potential_return: row.get(9)?,
            commission_json: row.get(10)?,
            status: row.get(11)?,
            result: row.get(12)?,
            created_at_ms: row.get(13)?,
            used_ai_recommendation: row.get(14)?,
        })
    }

    fn into_bet(self) -> LedgerResult<Bet> {
        let status = BetStatus::from_str(&self.status).ok_or_else(|| {
            LedgerError::Corrupt(format!("bet {} has status {}", self.id, self.status))
        })?;
        let result = match self.result.as_deref() {
            None => None,
            Some(raw) => Some(BetOutcome::from_str(raw).ok_or_else(|| {
                LedgerError::Corrupt(format!("bet {} has result {}", self.id, raw))
            })?),
        };
        let commission: Commission = serde_json::from_str(&self.commission_json)?;

        Ok(Bet {
            estimated_result_time: timestamp(self.estimated_result_ms)?,
            created_at: timestamp(self.created_at_ms)?,
            id: self.id,
            user_id: self.user_id,
            selection_id: self.selection_id,
            event_name: self.event_name,
            selection_name: self.selection_name,
            odds: self.odds,
            stake_amount: self.stake_amount,
            currency: self.currency,
            potential_return: self.potential_return,
            commission,
            status,
            result,
            used_ai_recommendation: self.used_ai_recommendation,
        })
    }
}
