use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub fanout: FanoutConfig,
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Tuning knobs for the fan-out and backfill engines and the feed read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Upper bound on concurrently outstanding feed writes within one invocation.
    pub max_in_flight_writes: usize,
    /// Row cap applied to each directional friendship query.
    pub friend_query_limit: u32,
    pub default_page_size: u32,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_in_flight_writes: 64,
            friend_query_limit: 5_000,
            default_page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Zero disables the background sweeper.
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl SweeperConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let defaults = FanoutConfig::default();
        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/feed_fanout.db".to_string()),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env("SERVER_PORT", 3000)?,
            },
            fanout: FanoutConfig {
                max_in_flight_writes: parse_env("FANOUT_MAX_IN_FLIGHT", defaults.max_in_flight_writes)?,
                friend_query_limit: parse_env("FRIEND_QUERY_LIMIT", defaults.friend_query_limit)?,
                default_page_size: parse_env("FEED_DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            },
            sweeper: SweeperConfig {
                interval_secs: parse_env("SWEEP_INTERVAL_SECS", SweeperConfig::default().interval_secs)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.fanout.max_in_flight_writes == 0 {
            return Err(AppError::ConfigurationError(
                "FANOUT_MAX_IN_FLIGHT must be at least 1".to_string(),
            ));
        }
        if self.fanout.friend_query_limit == 0 {
            return Err(AppError::ConfigurationError(
                "FRIEND_QUERY_LIMIT must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::ConfigurationError(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            AppError::ConfigurationError(format!("{} has an invalid value: {:?}", key, raw))
        }),
        _ => Ok(default),
    }
}
