//! Outcome Generator
//!
//! Assigns a synthetic winner to every unresolved market of a completed event.
//! The randomness source is injected so runs are reproducible under a seed.

use crate::error::LedgerResult;
use crate::models::{EventFilter, EventStatus, Market, SelectionResult};
use crate::store::LedgerStore;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeReport {
    /// Completed events that had at least one market resolved in this pass
    pub events_resolved: usize,
    pub markets_resolved: usize,
}

/// Pick one selection uniformly at random as the winner; all siblings lose.
///
/// Returns `false` without touching the market when it already carries a
/// result or has no selections.
pub fn assign_winner<R: Rng>(market: &mut Market, rng: &mut R) -> bool {
    if market.is_resolved() || market.selections.is_empty() {
        return false;
    }

    let winner = rng.gen_range(0..market.selections.len());
    for (i, selection) in market.selections.iter_mut().enumerate() {
        selection.result = Some(if i == winner {
            SelectionResult::Win
        } else {
            SelectionResult::Loss
        });
    }
    true
}

/// Resolve all completed events that still have unresolved markets.
pub fn resolve_completed_events<R: Rng>(
    store: &dyn LedgerStore,
    rng: &mut R,
) -> LedgerResult<OutcomeReport> {
    let completed = store.scan_events(&EventFilter::with_statuses(&[EventStatus::Completed]))?;

    let mut report = OutcomeReport::default();
    for mut event in completed {
        let mut assigned = 0;
        for market in event.markets.iter_mut() {
            if market.selections.is_empty() {
                warn!(event_id = %event.id, market_id = %market.id, "Market has no selections");
                continue;
            }
            if assign_winner(market, rng) {
                assigned += 1;
            }
        }
        if assigned == 0 {
            continue;
        }

        match store.update_event_markets(&event.id, &event.markets) {
            Ok(0) => {
                debug!(event_id = %event.id, "Markets already resolved by another pass");
            }
            Ok(written) => {
                debug!(event_id = %event.id, markets = written, "Event outcomes generated");
                report.events_resolved += 1;
                report.markets_resolved += written;
            }
            Err(e) if e.is_per_entity() => {
                warn!(event_id = %event.id, "Skipping outcome generation: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    if report.events_resolved > 0 {
        info!(
            "🎲 Outcomes generated for {} events ({} markets)",
            report.events_resolved, report.markets_resolved
        );
    }
    Ok(report)
}
