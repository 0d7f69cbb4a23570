//! HTTP surface for the ledger
//!
//! Every route except `/health` and `/auth/login` sits behind the bearer-token
//! middleware; handlers read the caller's user id from the JWT claims.

pub mod bets;
pub mod simulation;

use crate::auth::{api as auth_api, auth_middleware, AuthState};
use crate::error::LedgerError;
use crate::ledger::SimulationRunner;
use crate::store::LedgerStore;
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn LedgerStore>,
    pub runner: Arc<SimulationRunner>,
}

impl ApiState {
    pub fn new(runner: Arc<SimulationRunner>) -> Self {
        Self {
            store: runner.store().clone(),
            runner,
        }
    }
}

/// Create the full API router
pub fn create_router(state: ApiState, auth: AuthState) -> Router {
    let jwt_handler = auth.jwt_handler.clone();

    let auth_router = Router::new()
        .route("/auth/login", post(auth_api::login))
        .with_state(auth);

    let protected_routes = Router::new()
        .route("/bets", post(bets::place_bet).get(bets::list_bets))
        .route("/bets/active", get(bets::active_bets))
        .route("/bets/history", get(bets::bet_history))
        .route("/bets/stats", get(bets::bet_stats))
        .route("/bets/:id", get(bets::get_bet))
        .route("/bets/:id/settle", post(bets::settle_bet))
        .route("/simulation/update-events", post(simulation::update_events))
        .route("/simulation/simulate-results", post(simulation::simulate_results))
        .route("/simulation/settle-bets", post(simulation::settle_bets))
        .route(
            "/simulation/run-simulation-cycle",
            post(simulation::run_simulation_cycle),
        )
        .route_layer(middleware::from_fn_with_state(jwt_handler, auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .merge(auth_router)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(LedgerError),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            LedgerError::InvalidOutcome(_)
            | LedgerError::InvalidStake(_)
            | LedgerError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            LedgerError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            LedgerError::Corrupt(_) | LedgerError::Store(_) | LedgerError::Codec(_) => {
                ApiError::Internal(err)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(err) => {
                error!("Ledger error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
