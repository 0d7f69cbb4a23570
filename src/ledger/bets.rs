//! Bet placement and per-user bet queries

use crate::error::{EntityKind, LedgerError, LedgerResult};
use crate::ledger::math::{aggregate_user_profit, commission, potential_return, UserProfitStats};
use crate::models::{Bet, BetFilter, BetStatus};
use crate::store::LedgerStore;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

fn default_currency() -> String {
    "USDC".to_string()
}

/// Request to back a selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBet {
    pub selection_id: String,
    pub stake_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub use_ai_recommendation: bool,
}

/// Snapshot the selection, price the bet and persist it as `placed`.
///
/// Odds, names and potential return are fixed here; later changes to the event
/// never reach an existing bet.
pub fn place_bet(
    store: &dyn LedgerStore,
    user_id: &str,
    request: &PlaceBet,
    now: DateTime<Utc>,
) -> LedgerResult<Bet> {
    let stake = request.stake_amount;
    if !stake.is_finite() || stake <= 0.0 {
        return Err(LedgerError::InvalidStake(stake));
    }
    if request.currency.trim().is_empty() {
        return Err(LedgerError::InvalidRequest("currency must not be empty".to_string()));
    }

    let not_found = || LedgerError::not_found(EntityKind::Selection, &request.selection_id);
    let event = store
        .find_selection_event(&request.selection_id)?
        .ok_or_else(not_found)?;
    let (_, selection) = event
        .find_selection(&request.selection_id)
        .ok_or_else(not_found)?;

    // Stored timestamps carry millisecond precision
    let now = now.trunc_subsecs(3);
    let bet = Bet {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        selection_id: selection.id.clone(),
        event_name: event.name.clone(),
        selection_name: selection.name.clone(),
        odds: selection.odds,
        estimated_result_time: event.end_time(),
        stake_amount: stake,
        currency: request.currency.clone(),
        potential_return: potential_return(stake, selection.odds),
        commission: commission(stake, request.use_ai_recommendation),
        status: BetStatus::Placed,
        result: None,
        created_at: now,
        used_ai_recommendation: request.use_ai_recommendation,
    };
    store.insert_bet(&bet)?;

    info!(
        "🎟️ Bet placed: {} on {} @ {} ({} {})",
        bet.id, bet.selection_name, bet.odds, bet.stake_amount, bet.currency
    );
    Ok(bet)
}

/// Status filter accepted by bet listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetListStatus {
    #[default]
    All,
    Placed,
    Settled,
}

impl BetListStatus {
    fn as_filter(self) -> Option<BetStatus> {
        match self {
            BetListStatus::All => None,
            BetListStatus::Placed => Some(BetStatus::Placed),
            BetListStatus::Settled => Some(BetStatus::Settled),
        }
    }
}

/// One page of a user's bets, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetPage {
    pub bets: Vec<Bet>,
    pub total_count: usize,
    pub page: usize,
}

pub fn list_user_bets(
    store: &dyn LedgerStore,
    user_id: &str,
    status: BetListStatus,
    limit: Option<usize>,
    page: Option<usize>,
) -> LedgerResult<BetPage> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);

    let mut filter = BetFilter {
        user_id: Some(user_id.to_string()),
        status: status.as_filter(),
        ..Default::default()
    };
    let total_count = store.count_bets(&filter)?;

    filter.limit = Some(limit);
    filter.offset = (page - 1).saturating_mul(limit);
    let bets = store.scan_bets(&filter)?;

    Ok(BetPage {
        bets,
        total_count,
        page,
    })
}

/// Fetch a bet that must belong to `user_id`.
pub fn get_user_bet(store: &dyn LedgerStore, user_id: &str, bet_id: &str) -> LedgerResult<Bet> {
    let bet = store
        .get_bet(bet_id)?
        .ok_or_else(|| LedgerError::not_found(EntityKind::Bet, bet_id))?;
    if bet.user_id != user_id {
        return Err(LedgerError::Forbidden {
            bet_id: bet_id.to_string(),
        });
    }
    Ok(bet)
}

pub fn user_stats(store: &dyn LedgerStore, user_id: &str) -> LedgerResult<UserProfitStats> {
    let settled = store.scan_bets(&BetFilter {
        user_id: Some(user_id.to_string()),
        status: Some(BetStatus::Settled),
        ..Default::default()
    })?;
    Ok(aggregate_user_profit(&settled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::settlement::settle_bet;
    use crate::models::{Event, EventStatus, Market, Selection};
    use crate::store::SqliteLedgerStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 18, 16, 0, 0).unwrap()
    }

    fn setup() -> SqliteLedgerStore {
        let store = SqliteLedgerStore::in_memory().unwrap();
        store
            .insert_event(&Event {
                id: "clasico".to_string(),
                name: "Barcelona vs Real Madrid".to_string(),
                sport_type: "football".to_string(),
                competition: "La Liga".to_string(),
                start_time: t0(),
                status: EventStatus::Upcoming,
                markets: vec![Market {
                    id: "winner".to_string(),
                    name: "Match Winner".to_string(),
                    selections: vec![
                        Selection::new("barca", "Barcelona", 2.5),
                        Selection::new("madrid", "Real Madrid", 1.8),
                    ],
                }],
            })
            .unwrap();
        store
    }

    fn request(selection_id: &str, stake: f64) -> PlaceBet {
        PlaceBet {
            selection_id: selection_id.to_string(),
            stake_amount: stake,
            currency: "USDC".to_string(),
            use_ai_recommendation: false,
        }
    }

    #[test]
    fn test_place_bet_snapshots_selection() {
        let store = setup();
        let now = t0() - Duration::hours(3);
        let mut req = request("barca", 100.0);
        req.use_ai_recommendation = true;

        let bet = place_bet(&store, "u1", &req, now).unwrap();
        assert_eq!(bet.event_name, "Barcelona vs Real Madrid");
        assert_eq!(bet.selection_name, "Barcelona");
        assert_eq!(bet.odds, 2.5);
        assert_eq!(bet.potential_return, 250.0);
        assert_eq!(bet.commission.standard, 3.0);
        assert_eq!(bet.commission.ai_premium, 1.0);
        assert_eq!(bet.estimated_result_time, t0() + Duration::hours(2));
        assert_eq!(bet.status, BetStatus::Placed);
        assert_eq!(bet.result, None);
        assert_eq!(bet.created_at, now);

        assert_eq!(store.get_bet(&bet.id).unwrap().unwrap(), bet);
    }

    #[test]
    fn test_placed_bet_matches_stored_bet_with_sub_millisecond_clock() {
        let store = setup();
        let now = t0() - Duration::hours(1) + Duration::nanoseconds(123_456_789);

        let bet = place_bet(&store, "u1", &request("madrid", 10.0), now).unwrap();
        assert_eq!(bet.created_at, t0() - Duration::hours(1) + Duration::milliseconds(123));
        assert_eq!(store.get_bet(&bet.id).unwrap().unwrap(), bet);
    }

    #[test]
    fn test_place_bet_rejections() {
        let store = setup();
        let now = t0();

        for stake in [0.0, -5.0, f64::NAN] {
            let err = place_bet(&store, "u1", &request("barca", stake), now).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidStake(_)));
        }

        let err = place_bet(&store, "u1", &request("nope", 10.0), now).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { kind: EntityKind::Selection, .. }));

        let mut req = request("barca", 10.0);
        req.currency = " ".to_string();
        let err = place_bet(&store, "u1", &req, now).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));

        assert_eq!(store.count_bets(&BetFilter::default()).unwrap(), 0);
    }

    #[test]
    fn test_list_user_bets_filters_and_pages() {
        let store = setup();
        for i in 0..5 {
            place_bet(&store, "u1", &request("barca", 10.0), t0() + Duration::minutes(i)).unwrap();
        }
        place_bet(&store, "u2", &request("madrid", 10.0), t0()).unwrap();
        let newest = store
            .scan_bets(&BetFilter {
                user_id: Some("u1".to_string()),
                limit: Some(1),
                ..Default::default()
            })
            .unwrap()
            .remove(0);
        settle_bet(&store, "u1", &newest.id, "win").unwrap();

        let all = list_user_bets(&store, "u1", BetListStatus::All, Some(2), Some(1)).unwrap();
        assert_eq!(all.total_count, 5);
        assert_eq!(all.page, 1);
        assert_eq!(all.bets.len(), 2);
        assert_eq!(all.bets[0].id, newest.id);
        assert!(all.bets[0].created_at > all.bets[1].created_at);

        let last = list_user_bets(&store, "u1", BetListStatus::All, Some(2), Some(3)).unwrap();
        assert_eq!(last.bets.len(), 1);

        let active = list_user_bets(&store, "u1", BetListStatus::Placed, None, None).unwrap();
        assert_eq!(active.total_count, 4);
        let history = list_user_bets(&store, "u1", BetListStatus::Settled, None, None).unwrap();
        assert_eq!(history.total_count, 1);
    }

    #[test]
    fn test_list_clamps_limit_and_page() {
        let store = setup();
        place_bet(&store, "u1", &request("barca", 10.0), t0()).unwrap();

        let page = list_user_bets(&store, "u1", BetListStatus::All, Some(0), Some(0)).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.bets.len(), 1);
    }

    #[test]
    fn test_get_user_bet_ownership() {
        let store = setup();
        let bet = place_bet(&store, "u1", &request("barca", 10.0), t0()).unwrap();

        assert_eq!(get_user_bet(&store, "u1", &bet.id).unwrap().id, bet.id);
        assert!(matches!(
            get_user_bet(&store, "u2", &bet.id).unwrap_err(),
            LedgerError::Forbidden { .. }
        ));
        assert!(matches!(
            get_user_bet(&store, "u1", "missing").unwrap_err(),
            LedgerError::NotFound { .. }
        ));
    }

    #[test]
    fn test_user_stats_over_settled_bets() {
        let store = setup();
        let win = place_bet(&store, "u1", &request("barca", 100.0), t0()).unwrap();
        let loss = place_bet(&store, "u1", &request("madrid", 50.0), t0()).unwrap();
        place_bet(&store, "u1", &request("barca", 70.0), t0()).unwrap();

        settle_bet(&store, "u1", &win.id, "win").unwrap();
        settle_bet(&store, "u1", &loss.id, "loss").unwrap();

        let stats = user_stats(&store, "u1").unwrap();
        assert_eq!(stats.total_bets, 2);
        assert_eq!(stats.total_staked, 150.0);
        assert_eq!(stats.total_returned, 250.0);
        assert_eq!(stats.total_profit, 100.0);
        assert_eq!(stats.win_rate, 50.0);
        assert_eq!(stats.roi, 66.67);

        assert_eq!(user_stats(&store, "nobody").unwrap().total_bets, 0);
    }
}
