//! Configuration loader for the `gipis-weather` telemetry server.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Handlers never read the environment directly; they
//! receive the loaded [`Config`] through the router state.
//!
use std::{env, net::SocketAddr};

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable, falling back to a default.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

const DEFAULT_DB_URL: &str = "sqlite://data/weather.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// SQLite connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Upper bound for `limit` on history queries.
    pub history_max_limit: u32,

    /// Upper bound (and default) for the number of rows in a CSV export.
    pub export_max_limit: u32,

    /// Bearer token required on dashboard mutations. `None` leaves them open.
    pub dashboard_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        Config {
            db_url: DEFAULT_DB_URL.to_string(),
            db_pool_max: 5,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            history_max_limit: 1000,
            export_max_limit: 10_000,
            dashboard_token: None,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATABASE_URL` – SQLite connection string (default: `sqlite://data/weather.db?mode=rwc`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:3000`)
/// - `HISTORY_MAX_LIMIT` – cap on history row count (default: 1000)
/// - `EXPORT_MAX_LIMIT` – cap on CSV export row count (default: 10000)
/// - `DASHBOARD_TOKEN` – bearer token for dashboard mutations (default: unset)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = env_or!("DATABASE_URL", DEFAULT_DB_URL);
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let bind_addr = env_or!("BIND_ADDR", DEFAULT_BIND_ADDR)
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?;
    let history_max_limit = parse_env_u32!("HISTORY_MAX_LIMIT", 1000);
    let export_max_limit = parse_env_u32!("EXPORT_MAX_LIMIT", 10_000);
    let dashboard_token = env::var("DASHBOARD_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    if db_pool_max == 0 {
        return Err(anyhow!("DB_POOL_MAX must be at least 1"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        bind_addr,
        history_max_limit,
        export_max_limit,
        dashboard_token,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// The dashboard token is never printed, only whether one is configured.
    pub fn log_config(&self) {
        // ---
        let token = if self.dashboard_token.is_some() {
            "****"
        } else {
            "(unset, dashboard mutations are open)"
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL      : {}", self.db_url);
        tracing::info!("  DB_POOL_MAX       : {}", self.db_pool_max);
        tracing::info!("  BIND_ADDR         : {}", self.bind_addr);
        tracing::info!("  HISTORY_MAX_LIMIT : {}", self.history_max_limit);
        tracing::info!("  EXPORT_MAX_LIMIT  : {}", self.export_max_limit);
        tracing::info!("  DASHBOARD_TOKEN   : {}", token);
    }
}
