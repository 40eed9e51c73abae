use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::logging::LoggingConfig;

pub const DEFAULT_FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct QuoteConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Provider budget; Finnhub's free tier allows 60 calls per minute.
    pub calls_per_minute: u32,
    pub enforce_rate_limit: bool,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub enabled: bool,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    /// `seed_user` is registered at startup so the API is usable without a user service.
    Memory { seed_user: Option<Uuid> },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub quote: QuoteConfig,
    pub sync: SyncConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("FINNHUB_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("FINNHUB_API_KEY"))?;

        let calls_per_minute: u32 = parse_or(&lookup, "QUOTE_CALLS_PER_MINUTE", 60)?;
        if calls_per_minute == 0 {
            return Err(ConfigError::Invalid {
                var: "QUOTE_CALLS_PER_MINUTE",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let quote = QuoteConfig {
            api_key,
            base_url: lookup("FINNHUB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FINNHUB_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "QUOTE_TIMEOUT_SECS", 5)?),
            calls_per_minute,
            enforce_rate_limit: parse_or(&lookup, "QUOTE_ENFORCE_RATE_LIMIT", false)?,
        };

        let interval_secs: u64 = parse_or(&lookup, "PRICE_SYNC_INTERVAL_SECS", 10)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "PRICE_SYNC_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let sync = SyncConfig {
            enabled: parse_or(&lookup, "PRICE_SYNC_ENABLED", true)?,
            interval: Duration::from_secs(interval_secs),
        };

        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "postgres".to_string());
        let store = match backend.to_lowercase().as_str() {
            "postgres" => StoreConfig::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            "memory" => StoreConfig::Memory {
                seed_user: lookup("MEMORY_SEED_USER")
                    .map(|raw| {
                        raw.trim().parse::<Uuid>().map_err(|e| ConfigError::Invalid {
                            var: "MEMORY_SEED_USER",
                            reason: e.to_string(),
                            value: raw,
                        })
                    })
                    .transpose()?,
            },
            _ => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    value: backend,
                    reason: "must be 'postgres' or 'memory'".into(),
                })
            }
        };

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            quote,
            sync,
            store,
            logging: LoggingConfig::from_lookup(&lookup),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
