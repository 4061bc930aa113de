//! Server settings from the environment.
//!
//! `HOST` and `PORT` pick the listen address (defaults `0.0.0.0:8080` so the app is
//! reachable on a VPS), `DATABASE_PATH` the SQLite file (`:memory:` keeps
//! everything in process), and `WORKER_IDLE_SECS` how long an untouched contest
//! worker lives.

use std::time::Duration;

/// Default idle time before a contest worker is dropped: 12 hours.
pub const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(12 * 3600);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub worker_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: ":memory:".to_string(),
            worker_idle: DEFAULT_WORKER_IDLE,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            database_path: lookup("DATABASE_PATH")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.database_path),
            worker_idle: lookup("WORKER_IDLE_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.worker_idle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn falls_back_to_defaults() {
        let env: HashMap<&str, &str> = [("PORT", "not-a-port"), ("DATABASE_PATH", " ")].into();
        let config = ServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let env: HashMap<&str, &str> =
            [("HOST", "127.0.0.1"), ("PORT", "9000"), ("DATABASE_PATH", "club.db"), ("WORKER_IDLE_SECS", "60")].into();
        let config = ServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, "club.db");
        assert_eq!(config.worker_idle, Duration::from_secs(60));
    }
}
