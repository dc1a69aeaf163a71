//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{HOLD_DURATION_MINUTES, SWEEP_INTERVAL_SECS};
use lifecycle::LifecycleConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory storage when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `SWEEP_INTERVAL_SECS`: expiry sweep period (default: `300`)
/// - `BOOKING_HOLD_MINUTES`: pending hold window (default: `15`)
///
/// Unparseable numbers fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub sweep_interval: Duration,
    pub hold_duration: chrono::Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match get("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: get("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            sweep_interval: get("SWEEP_INTERVAL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            hold_duration: get("BOOKING_HOLD_MINUTES")
                .and_then(|m| m.parse::<i64>().ok())
                .filter(|minutes| *minutes > 0)
                .map(chrono::Duration::minutes)
                .unwrap_or(defaults.hold_duration),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the lifecycle settings.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            hold_duration: self.hold_duration,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            sweep_interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
            hold_duration: chrono::Duration::minutes(HOLD_DURATION_MINUTES),
        }
    }
}
