//! Simulation Cycle Orchestrator
//!
//! One pass runs lifecycle -> outcomes -> settlement strictly in that order:
//! outcome generation needs the new `completed` statuses and settlement needs
//! the freshly written selection results. A pass that changes nothing is the
//! normal steady state between wall-clock milestones.

use crate::error::LedgerResult;
use crate::ledger::lifecycle::{LifecycleController, LifecycleReport};
use crate::ledger::outcomes::{resolve_completed_events, OutcomeReport};
use crate::ledger::settlement::{settle_pending_bets, SettlementReport, UnresolvableBet};
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

/// What one full pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub live_updated: usize,
    pub completed_updated: usize,
    pub events_resolved: usize,
    pub markets_resolved: usize,
    pub bets_settled: usize,
    pub bets_pending: usize,
    pub unresolvable_bets: Vec<UnresolvableBet>,
}

impl CycleSummary {
    fn new(lifecycle: LifecycleReport, outcomes: OutcomeReport, settlement: SettlementReport) -> Self {
        Self {
            live_updated: lifecycle.live_updated,
            completed_updated: lifecycle.completed_updated,
            events_resolved: outcomes.events_resolved,
            markets_resolved: outcomes.markets_resolved,
            bets_settled: settlement.settled.len(),
            bets_pending: settlement.pending,
            unresolvable_bets: settlement.unresolvable,
        }
    }

    /// True when the pass made no transition at all
    pub fn is_noop(&self) -> bool {
        self.live_updated == 0
            && self.completed_updated == 0
            && self.markets_resolved == 0
            && self.bets_settled == 0
    }
}

/// Run one full pass against `store` at `now`.
pub fn run_cycle<R: Rng>(
    store: &dyn LedgerStore,
    lifecycle: &LifecycleController,
    now: DateTime<Utc>,
    rng: &mut R,
) -> LedgerResult<CycleSummary> {
    let statuses = lifecycle.advance(store, now)?;
    let outcomes = resolve_completed_events(store, rng)?;
    let settlement = settle_pending_bets(store)?;

    let summary = CycleSummary::new(statuses, outcomes, settlement);
    if summary.is_noop() {
        debug!("Simulation cycle: nothing to do");
    } else {
        info!(
            "🔄 Simulation cycle: {} live, {} completed, {} events resolved, {} bets settled",
            summary.live_updated,
            summary.completed_updated,
            summary.events_resolved,
            summary.bets_settled
        );
    }
    Ok(summary)
}

/// Shared entry point for HTTP handlers, the CLI and the background timer.
///
/// Passes triggered through the same runner are serialized by the RNG lock.
/// Passes from separate processes rely on the store's guarded updates.
pub struct SimulationRunner {
    store: Arc<dyn LedgerStore>,
    lifecycle: LifecycleController,
    rng: Mutex<ChaCha8Rng>,
}

impl SimulationRunner {
    /// `seed = None` draws the RNG seed from OS entropy.
    pub fn new(store: Arc<dyn LedgerStore>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            store,
            lifecycle: LifecycleController::default(),
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn run_cycle(&self, now: DateTime<Utc>) -> LedgerResult<CycleSummary> {
        let mut rng = self.rng.lock();
        run_cycle(self.store.as_ref(), &self.lifecycle, now, &mut *rng)
    }

    pub fn update_events(&self, now: DateTime<Utc>) -> LedgerResult<LifecycleReport> {
        let _guard = self.rng.lock();
        self.lifecycle.advance(self.store.as_ref(), now)
    }

    pub fn simulate_results(&self) -> LedgerResult<OutcomeReport> {
        let mut rng = self.rng.lock();
        resolve_completed_events(self.store.as_ref(), &mut *rng)
    }

    pub fn settle_bets(&self) -> LedgerResult<SettlementReport> {
        let _guard = self.rng.lock();
        settle_pending_bets(self.store.as_ref())
    }
}

/// Run a simulation cycle every `period` until the task is dropped.
/// A failed pass is logged and retried on the next tick.
pub fn spawn_simulation_timer(runner: Arc<SimulationRunner>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("⏲️ Simulation timer running every {}s", period.as_secs());
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = runner.run_cycle(Utc::now()) {
                error!("Simulation cycle failed: {}", e);
            }
        }
    })
}
