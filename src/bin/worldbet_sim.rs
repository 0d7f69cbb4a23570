//! WorldBet simulation tool
//!
//! Runs ledger passes against a database without starting the server.
//!
//! Usage:
//!   cargo run --bin worldbet-sim -- cycle --seed 42
//!   cargo run --bin worldbet-sim -- cycle --at 2026-05-18T20:00:00Z
//!   cargo run --bin worldbet-sim -- seed
//!   cargo run --bin worldbet-sim -- stats --username alice

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use worldbet_ledger::{
    config::{init_tracing, load_env, resolve_data_path, DEFAULT_DB_FILENAME},
    ledger::{user_stats, SimulationRunner},
    store::{seed::seed_if_empty, LedgerStore, SqliteLedgerStore},
};

/// Drive the WorldBet ledger from the command line
#[derive(Parser, Debug)]
#[command(name = "worldbet-sim")]
#[command(about = "Run simulation passes and inspect a WorldBet ledger database")]
struct Cli {
    /// Path to the SQLite ledger (relative paths resolve against the crate directory)
    #[arg(short, long, env = "WORLDBET_DB_PATH")]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Advance statuses, generate outcomes and settle bets once
    Cycle {
        /// Fixed RNG seed for outcome generation
        #[arg(short, long, env = "SIMULATION_SEED")]
        seed: Option<u64>,

        /// Evaluate the pass as of this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Insert the sample events if the ledger has none
    Seed,

    /// Print profit statistics for a user
    Stats {
        #[arg(short, long)]
        username: String,
    },
}

fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let db_path = resolve_data_path(cli.db_path, DEFAULT_DB_FILENAME);
    let store: Arc<dyn LedgerStore> = Arc::new(
        SqliteLedgerStore::open(&db_path)
            .with_context(|| format!("Failed to open ledger at {}", db_path))?,
    );

    match cli.command {
        Commands::Cycle { seed, at } => {
            let runner = SimulationRunner::new(store, seed);
            let summary = runner.run_cycle(at.unwrap_or_else(Utc::now))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Seed => {
            let inserted = seed_if_empty(store.as_ref(), Utc::now())?;
            println!("Inserted {} sample events", inserted);
        }
        Commands::Stats { username } => {
            let user = store
                .get_user_by_username(&username)?
                .with_context(|| format!("No user named {}", username))?;
            let stats = user_stats(store.as_ref(), &user.id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
