//! WorldBet ledger server
//! Serves the bet and simulation API and optionally runs the simulation on a timer

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use worldbet_ledger::{
    api::{create_router, ApiState},
    auth::{AuthState, JwtHandler},
    config::{init_tracing, load_env, LedgerConfig},
    ledger::{spawn_simulation_timer, SimulationRunner},
    store::{seed::seed_if_empty, LedgerStore, SqliteLedgerStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    info!("🚀 WorldBet ledger starting");

    let config = LedgerConfig::from_env()?;

    let store: Arc<dyn LedgerStore> = Arc::new(
        SqliteLedgerStore::open(&config.db_path)
            .with_context(|| format!("Failed to open ledger at {}", config.db_path))?,
    );
    info!("💾 Events in ledger: {}", store.count_events()?);

    if config.seed_sample_data {
        seed_if_empty(store.as_ref(), Utc::now()).context("Failed to seed sample events")?;
    }

    let runner = Arc::new(SimulationRunner::new(store.clone(), config.simulation_seed));
    if let Some(period) = config.simulation_interval {
        spawn_simulation_timer(runner.clone(), period);
    } else {
        info!("⏸️ Background simulation disabled; trigger passes via /simulation");
    }

    let jwt_handler = Arc::new(JwtHandler::new(
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
    ));
    let app = create_router(ApiState::new(runner), AuthState::new(store, jwt_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
