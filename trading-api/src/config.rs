//! Server configuration loaded from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use trading_core::{TradingError, TradingResult};
use trading_services::websocket::{
    DEFAULT_CLIENT_QUEUE_CAPACITY, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_SEND_TIMEOUT,
};

/// Runtime configuration for the API server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (`SERVER_PORT`)
    pub port: u16,
    /// SQLite database file (`DATABASE_PATH`)
    pub database_path: PathBuf,
    /// Pending events between HTTP handlers and the dispatcher (`EVENT_QUEUE_CAPACITY`)
    pub event_queue_capacity: usize,
    /// Pending events per WebSocket client (`CLIENT_QUEUE_CAPACITY`)
    pub client_queue_capacity: usize,
    /// Bound on a single WebSocket write (`WS_SEND_TIMEOUT_MS`)
    pub send_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            database_path: PathBuf::from("data/orders.db"),
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> TradingResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to
    /// defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> TradingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            port: parse_or(&lookup, "SERVER_PORT", defaults.port)?,
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            event_queue_capacity: parse_or(
                &lookup,
                "EVENT_QUEUE_CAPACITY",
                defaults.event_queue_capacity,
            )?,
            client_queue_capacity: parse_or(
                &lookup,
                "CLIENT_QUEUE_CAPACITY",
                defaults.client_queue_capacity,
            )?,
            send_timeout: lookup("WS_SEND_TIMEOUT_MS")
                .map(|raw| parse_value::<u64>("WS_SEND_TIMEOUT_MS", &raw))
                .transpose()?
                .map(Duration::from_millis)
                .unwrap_or(defaults.send_timeout),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> TradingResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> TradingResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| TradingError::config(format!("{} has invalid value {:?}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.database_path, PathBuf::from("data/orders.db"));
        assert_eq!(config.send_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SERVER_PORT", "9100"),
            ("DATABASE_PATH", "/tmp/orders.db"),
            ("EVENT_QUEUE_CAPACITY", "16"),
            ("CLIENT_QUEUE_CAPACITY", "4"),
            ("WS_SEND_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.database_path, PathBuf::from("/tmp/orders.db"));
        assert_eq!(config.event_queue_capacity, 16);
        assert_eq!(config.client_queue_capacity, 4);
        assert_eq!(config.send_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let err = ServerConfig::from_lookup(lookup(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, TradingError::Config(ref msg) if msg.contains("SERVER_PORT")));
    }
}
