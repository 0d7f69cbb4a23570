//! Settlement Engine
//!
//! Two paths settle bets:
//! - automatic: every placed bet whose selection belongs to a completed event
//!   with generated outcomes is settled win/loss straight from the selection
//!   result (binary policy; no partial outcomes)
//! - manual: a bet owner supplies any of the five outcome classes explicitly
//!
//! Settlement is terminal. The store only flips `placed -> settled`, so a bet
//! is settled exactly once even when passes overlap.

use crate::error::{EntityKind, LedgerError, LedgerResult};
use crate::ledger::math::{settle_payout, Payout};
use crate::models::{Bet, BetFilter, BetOutcome, BetStatus, EventStatus, SelectionResult};
use crate::store::LedgerStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A placed bet whose selection exists in no event. It can never settle and
/// needs operator attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvableBet {
    pub bet_id: String,
    pub selection_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Bets settled by this pass, with their final status and result
    pub settled: Vec<Bet>,
    /// Bets still waiting on their event to complete or resolve
    pub pending: usize,
    pub unresolvable: Vec<UnresolvableBet>,
}

/// What the store currently says about a selection.
#[derive(Debug, Clone, Copy)]
enum SelectionState {
    Missing,
    Pending,
    Resolved(SelectionResult),
}

fn selection_state(store: &dyn LedgerStore, selection_id: &str) -> LedgerResult<SelectionState> {
    let Some(event) = store.find_selection_event(selection_id)? else {
        return Ok(SelectionState::Missing);
    };
    if event.status != EventStatus::Completed {
        return Ok(SelectionState::Pending);
    }

    Ok(match event.find_selection(selection_id) {
        // Indexed but no longer present in the event's markets
        None => SelectionState::Missing,
        Some((_, selection)) => match selection.result {
            Some(result) => SelectionState::Resolved(result),
            None => SelectionState::Pending,
        },
    })
}

/// Settle every placed bet whose selection has a result.
pub fn settle_pending_bets(store: &dyn LedgerStore) -> LedgerResult<SettlementReport> {
    let placed = store.scan_bets(&BetFilter {
        status: Some(BetStatus::Placed),
        ..Default::default()
    })?;

    let mut report = SettlementReport::default();
    let mut states: HashMap<String, SelectionState> = HashMap::new();

    for mut bet in placed {
        let state = match states.get(&bet.selection_id) {
            Some(state) => *state,
            None => match selection_state(store, &bet.selection_id) {
                Ok(state) => {
                    states.insert(bet.selection_id.clone(), state);
                    state
                }
                Err(e) if e.is_per_entity() => {
                    warn!(bet_id = %bet.id, "Skipping bet, selection lookup failed: {}", e);
                    report.pending += 1;
                    continue;
                }
                Err(e) => return Err(e),
            },
        };

        let result = match state {
            SelectionState::Missing => {
                warn!(
                    bet_id = %bet.id,
                    selection_id = %bet.selection_id,
                    "⚠️ Bet references a selection that exists in no event"
                );
                report.unresolvable.push(UnresolvableBet {
                    bet_id: bet.id.clone(),
                    selection_id: bet.selection_id.clone(),
                });
                continue;
            }
            SelectionState::Pending => {
                report.pending += 1;
                continue;
            }
            SelectionState::Resolved(result) => result,
        };

        let outcome = BetOutcome::from(result);
        match store.update_bet_settlement(&bet.id, outcome) {
            Ok(true) => {
                debug!(bet_id = %bet.id, outcome = outcome.as_str(), "Bet settled");
                bet.status = BetStatus::Settled;
                bet.result = Some(outcome);
                report.settled.push(bet);
            }
            Ok(false) => {
                debug!(bet_id = %bet.id, "Bet already settled by another pass");
            }
            Err(e) if e.is_per_entity() => {
                warn!(bet_id = %bet.id, "Skipping bet settlement: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    if !report.settled.is_empty() {
        info!(
            "💰 Settled {} bets ({} pending, {} unresolvable)",
            report.settled.len(),
            report.pending,
            report.unresolvable.len()
        );
    }
    Ok(report)
}

/// A bet after manual settlement together with what it pays out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledBet {
    pub bet: Bet,
    pub payout: Payout,
}

/// Manually settle one bet owned by `user_id` with an explicit outcome.
///
/// The outcome is validated before anything is read or written. Settling an
/// already settled bet returns the stored bet unchanged.
pub fn settle_bet(
    store: &dyn LedgerStore,
    user_id: &str,
    bet_id: &str,
    outcome: &str,
) -> LedgerResult<SettledBet> {
    let outcome = BetOutcome::from_str(outcome)
        .ok_or_else(|| LedgerError::InvalidOutcome(outcome.to_string()))?;

    let mut bet = store
        .get_bet(bet_id)?
        .ok_or_else(|| LedgerError::not_found(EntityKind::Bet, bet_id))?;
    if bet.user_id != user_id {
        return Err(LedgerError::Forbidden {
            bet_id: bet_id.to_string(),
        });
    }

    if !bet.is_settled() {
        if store.update_bet_settlement(bet_id, outcome)? {
            info!(bet_id = %bet_id, outcome = outcome.as_str(), "Bet settled manually");
            bet.status = BetStatus::Settled;
            bet.result = Some(outcome);
        } else {
            // Lost the race to another settlement; report what was stored
            bet = store
                .get_bet(bet_id)?
                .ok_or_else(|| LedgerError::not_found(EntityKind::Bet, bet_id))?;
        }
    }

    let final_outcome = bet
        .result
        .ok_or_else(|| LedgerError::Corrupt(format!("settled bet {bet_id} has no result")))?;
    Ok(SettledBet {
        payout: settle_payout(&bet, final_outcome),
        bet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::math::{commission, potential_return};
    use crate::models::{Commission, Event, Market, Selection};
    use crate::store::SqliteLedgerStore;
    use chrono::Utc;

    fn store_with_event(status: EventStatus, results: Option<(SelectionResult, SelectionResult)>) -> SqliteLedgerStore {
        let store = SqliteLedgerStore::in_memory().unwrap();
        let mut home = Selection::new("home", "Barcelona", 2.5);
        let mut away = Selection::new("away", "Real Madrid", 3.2);
        if let Some((h, a)) = results {
            home.result = Some(h);
            away.result = Some(a);
        }
        store
            .insert_event(&Event {
                id: "clasico".to_string(),
                name: "Barcelona vs Real Madrid".to_string(),
                sport_type: "football".to_string(),
                competition: "La Liga".to_string(),
                start_time: Utc::now(),
                status,
                markets: vec![Market {
                    id: "winner".to_string(),
                    name: "Match Winner".to_string(),
                    selections: vec![home, away],
                }],
            })
            .unwrap();
        store
    }

    fn place(store: &SqliteLedgerStore, id: &str, user_id: &str, selection_id: &str, stake: f64) {
        let odds = 2.5;
        let commission: Commission = commission(stake, false);
        store
            .insert_bet(&Bet {
                id: id.to_string(),
                user_id: user_id.to_string(),
                selection_id: selection_id.to_string(),
                event_name: "Barcelona vs Real Madrid".to_string(),
                selection_name: selection_id.to_string(),
                odds,
                estimated_result_time: Utc::now(),
                stake_amount: stake,
                currency: "USDC".to_string(),
                potential_return: potential_return(stake, odds),
                commission,
                status: BetStatus::Placed,
                result: None,
                created_at: Utc::now(),
                used_ai_recommendation: false,
            })
            .unwrap();
    }

    #[test]
    fn test_auto_settlement_maps_selection_results() {
        let store = store_with_event(
            EventStatus::Completed,
            Some((SelectionResult::Win, SelectionResult::Loss)),
        );
        place(&store, "b-home", "u1", "home", 100.0);
        place(&store, "b-away", "u1", "away", 50.0);

        let report = settle_pending_bets(&store).unwrap();
        assert_eq!(report.settled.len(), 2);
        assert_eq!(report.pending, 0);
        assert!(report.unresolvable.is_empty());

        let home = store.get_bet("b-home").unwrap().unwrap();
        assert_eq!(home.status, BetStatus::Settled);
        assert_eq!(home.result, Some(BetOutcome::Win));
        let away = store.get_bet("b-away").unwrap().unwrap();
        assert_eq!(away.result, Some(BetOutcome::Loss));
    }

    #[test]
    fn test_unresolved_events_leave_bets_pending() {
        let store = store_with_event(EventStatus::Live, None);
        place(&store, "b1", "u1", "home", 10.0);

        let report = settle_pending_bets(&store).unwrap();
        assert!(report.settled.is_empty());
        assert_eq!(report.pending, 1);

        // Completed but outcomes not generated yet
        store.update_event_status("clasico", EventStatus::Completed).unwrap();
        let report = settle_pending_bets(&store).unwrap();
        assert_eq!(report.pending, 1);
        assert_eq!(store.get_bet("b1").unwrap().unwrap().status, BetStatus::Placed);
    }

    #[test]
    fn test_unknown_selection_is_reported_not_settled() {
        let store = store_with_event(
            EventStatus::Completed,
            Some((SelectionResult::Win, SelectionResult::Loss)),
        );
        place(&store, "orphan", "u1", "no-such-selection", 10.0);
        place(&store, "good", "u1", "home", 10.0);

        let report = settle_pending_bets(&store).unwrap();
        assert_eq!(report.settled.len(), 1);
        assert_eq!(
            report.unresolvable,
            vec![UnresolvableBet {
                bet_id: "orphan".to_string(),
                selection_id: "no-such-selection".to_string(),
            }]
        );
        let orphan = store.get_bet("orphan").unwrap().unwrap();
        assert_eq!(orphan.status, BetStatus::Placed);
        assert_eq!(orphan.result, None);
    }

    #[test]
    fn test_second_pass_settles_nothing() {
        let store = store_with_event(
            EventStatus::Completed,
            Some((SelectionResult::Loss, SelectionResult::Win)),
        );
        place(&store, "b1", "u1", "away", 10.0);

        assert_eq!(settle_pending_bets(&store).unwrap().settled.len(), 1);
        let again = settle_pending_bets(&store).unwrap();
        assert!(again.settled.is_empty());
        assert_eq!(
            store.get_bet("b1").unwrap().unwrap().result,
            Some(BetOutcome::Win)
        );
    }

    #[test]
    fn test_resolution_with_new_odds_pays_at_placed_odds() {
        let store = store_with_event(EventStatus::Upcoming, None);
        place(&store, "b1", "u1", "home", 100.0);

        // Resolution arrives carrying different prices
        let mut markets = store.get_event("clasico").unwrap().unwrap().markets;
        for selection in markets[0].selections.iter_mut() {
            selection.odds = 9.0;
        }
        markets[0].selections[0].result = Some(SelectionResult::Win);
        markets[0].selections[1].result = Some(SelectionResult::Loss);
        assert!(store.update_event_status("clasico", EventStatus::Completed).unwrap());
        assert_eq!(store.update_event_markets("clasico", &markets).unwrap(), 1);

        let report = settle_pending_bets(&store).unwrap();
        assert_eq!(report.settled.len(), 1);

        let bet = store.get_bet("b1").unwrap().unwrap();
        assert_eq!(bet.result, Some(BetOutcome::Win));
        assert_eq!(bet.odds, 2.5);
        assert_eq!(bet.potential_return, 250.0);
        assert_eq!(
            settle_payout(&bet, BetOutcome::Win),
            Payout { returned: 250.0, profit: 150.0 }
        );

        let stored = store.get_event("clasico").unwrap().unwrap();
        assert_eq!(stored.markets[0].selections[0].odds, 2.5);
        assert_eq!(stored.markets[0].selections[1].odds, 3.2);
    }

    #[test]
    fn test_manual_settlement_half_win() {
        let store = store_with_event(EventStatus::Upcoming, None);
        place(&store, "b1", "u1", "home", 100.0);

        let settled = settle_bet(&store, "u1", "b1", "half_win").unwrap();
        assert_eq!(settled.bet.status, BetStatus::Settled);
        assert_eq!(settled.bet.result, Some(BetOutcome::HalfWin));
        assert_eq!(settled.payout, Payout { returned: 175.0, profit: 75.0 });
    }

    #[test]
    fn test_manual_settlement_is_terminal() {
        let store = store_with_event(EventStatus::Upcoming, None);
        place(&store, "b1", "u1", "home", 100.0);

        settle_bet(&store, "u1", "b1", "void").unwrap();
        let again = settle_bet(&store, "u1", "b1", "win").unwrap();
        assert_eq!(again.bet.result, Some(BetOutcome::Void));
        assert_eq!(again.payout, Payout { returned: 100.0, profit: 0.0 });
    }

    #[test]
    fn test_manual_settlement_rejections() {
        let store = store_with_event(EventStatus::Upcoming, None);
        place(&store, "b1", "u1", "home", 100.0);

        let err = settle_bet(&store, "u1", "b1", "push").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOutcome(_)));

        let err = settle_bet(&store, "u2", "b1", "win").unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden { .. }));

        let err = settle_bet(&store, "u1", "missing", "win").unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { kind: EntityKind::Bet, .. }));

        // Nothing was mutated by the rejected calls
        assert_eq!(store.get_bet("b1").unwrap().unwrap().status, BetStatus::Placed);
    }
}
