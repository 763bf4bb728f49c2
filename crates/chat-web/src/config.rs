//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Chat web server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Local agent cache file.
    pub agent_cache_path: String,
    /// Identity the store and controller act for.
    pub user_id: String,
    /// Seed the built-in agents into an empty cache.
    pub seed_default_agents: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CHAT_ADDR` | Server bind address | `127.0.0.1:8788` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:agent-chat.db?mode=rwc` |
    /// | `AGENT_CACHE_PATH` | Local agent cache file | `agent-cache.json` |
    /// | `CHAT_USER_ID` | Caller identity | `guest` |
    /// | `SEED_DEFAULT_AGENTS` | Seed built-in agents | `true` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup("CHAT_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8788".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            lookup("SQLITE_PATH").unwrap_or_else(|| "sqlite:agent-chat.db?mode=rwc".to_string());

        let agent_cache_path =
            lookup("AGENT_CACHE_PATH").unwrap_or_else(|| "agent-cache.json".to_string());

        let user_id = lookup("CHAT_USER_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| "guest".to_string());

        let seed_default_agents = match lookup("SEED_DEFAULT_AGENTS") {
            None => true,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(ConfigError::InvalidFlag("SEED_DEFAULT_AGENTS")),
            },
        };

        Ok(Self {
            addr,
            database_url,
            agent_cache_path,
            user_id,
            seed_default_agents,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid CHAT_ADDR format")]
    InvalidAddr,

    #[error("{0} must be true or false")]
    InvalidFlag(&'static str),
}
