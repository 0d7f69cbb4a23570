//! Runtime configuration
//! Environment-driven settings shared by the server and the CLI

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_FILENAME: &str = "worldbet.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub db_path: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    /// `None` disables the background simulation timer
    pub simulation_interval: Option<Duration>,
    pub simulation_seed: Option<u64>,
    pub seed_sample_data: bool,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = resolve_data_path(var("WORLDBET_DB_PATH"), DEFAULT_DB_FILENAME);
        let bind_addr = var("WORLDBET_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let jwt_expiration_hours = var("JWT_EXPIRATION_HOURS")
            .unwrap_or_else(|| "24".to_string())
            .parse::<i64>()
            .context("Invalid JWT_EXPIRATION_HOURS")?;

        let interval_secs = var("SIMULATION_INTERVAL_SECS")
            .unwrap_or_else(|| "0".to_string())
            .parse::<u64>()
            .context("Invalid SIMULATION_INTERVAL_SECS")?;

        let simulation_seed = var("SIMULATION_SEED")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("Invalid SIMULATION_SEED")?;

        let seed_sample_data = var("SEED_SAMPLE_DATA")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(true);

        Ok(Self {
            db_path,
            bind_addr,
            jwt_secret,
            jwt_expiration_hours,
            simulation_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            simulation_seed,
            seed_sample_data,
        })
    }
}

fn default_data_path(filename: &str) -> String {
    // Anchor defaults to the crate directory
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join(filename).to_string_lossy().to_string()
}

/// Relative paths resolve against the crate directory, not the caller's cwd.
pub fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return default_data_path(default_filename);
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }
    base.join(p).to_string_lossy().to_string()
}

/// Load `.env` from the cwd search path and from the crate directory.
pub fn load_env() {
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

/// Install the global `tracing` subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldbet_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<LedgerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.db_path.ends_with(DEFAULT_DB_FILENAME));
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.jwt_expiration_hours, 24);
        assert!(cfg.simulation_interval.is_none());
        assert!(cfg.simulation_seed.is_none());
        assert!(cfg.seed_sample_data);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("WORLDBET_DB_PATH", "/tmp/ledger.db"),
            ("SIMULATION_INTERVAL_SECS", "30"),
            ("SIMULATION_SEED", "42"),
            ("SEED_SAMPLE_DATA", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.db_path, "/tmp/ledger.db");
        assert_eq!(cfg.simulation_interval, Some(Duration::from_secs(30)));
        assert_eq!(cfg.simulation_seed, Some(42));
        assert!(!cfg.seed_sample_data);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(config(&[("JWT_EXPIRATION_HOURS", "a day")]).is_err());
        assert!(config(&[("SIMULATION_INTERVAL_SECS", "-1")]).is_err());
        assert!(config(&[("SIMULATION_SEED", "seed")]).is_err());
    }

    #[test]
    fn test_relative_db_path_is_anchored() {
        let path = resolve_data_path(Some("data/ledger.db".to_string()), DEFAULT_DB_FILENAME);
        assert!(path.starts_with(env!("CARGO_MANIFEST_DIR")));
        assert!(path.ends_with("ledger.db"));
    }
}
