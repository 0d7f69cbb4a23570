//! Simulation endpoints: each step on its own, or the full cycle

use super::{ApiError, ApiState};
use crate::ledger::{
    lifecycle::LifecycleReport, outcomes::OutcomeReport, settlement::SettlementReport,
    simulation::CycleSummary,
};
use axum::{extract::State, response::Json};
use chrono::Utc;

/// POST /simulation/update-events
pub async fn update_events(
    State(state): State<ApiState>,
) -> Result<Json<LifecycleReport>, ApiError> {
    Ok(Json(state.runner.update_events(Utc::now())?))
}

/// POST /simulation/simulate-results
pub async fn simulate_results(
    State(state): State<ApiState>,
) -> Result<Json<OutcomeReport>, ApiError> {
    Ok(Json(state.runner.simulate_results()?))
}

/// POST /simulation/settle-bets
pub async fn settle_bets(
    State(state): State<ApiState>,
) -> Result<Json<SettlementReport>, ApiError> {
    Ok(Json(state.runner.settle_bets()?))
}

/// POST /simulation/run-simulation-cycle
pub async fn run_simulation_cycle(
    State(state): State<ApiState>,
) -> Result<Json<CycleSummary>, ApiError> {
    Ok(Json(state.runner.run_cycle(Utc::now())?))
}
