//! Loading configuration

use std::collections::HashMap;
use loadkit_core::{get_env_or_default, get_env_parsed, AppConfigTrait, ConfigError, ConfigSource};

use super::strategy::LoadingStrategy;

/// Runner settings read from `LOADING_STRATEGY`, `LOADING_LOG_QUERIES` and
/// `DATABASE_MAX_CONNECTIONS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingConfig {
    /// Strategy used when a caller does not name one
    pub default_strategy: LoadingStrategy,
    /// Emit a debug event for every round trip
    pub log_queries: bool,
    /// Upper bound for the PostgreSQL pool
    pub max_connections: u32,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            default_strategy: LoadingStrategy::Explicit,
            log_queries: true,
            max_connections: 5,
        }
    }
}

impl AppConfigTrait for LoadingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let strategy = get_env_or_default("LOADING_STRATEGY", "explicit")?;
        let default_strategy = strategy.parse::<LoadingStrategy>().map_err(|_| ConfigError::InvalidValue {
            field: "default_strategy".to_string(),
            value: strategy,
            expected: "lazy, eager, or explicit".to_string(),
        })?;

        let log_queries = get_env_parsed("LOADING_LOG_QUERIES", "log_queries", "true", "true or false")?;
        let max_connections =
            get_env_parsed("DATABASE_MAX_CONNECTIONS", "max_connections", "5", "a positive integer")?;

        Ok(LoadingConfig {
            default_strategy,
            log_queries,
            max_connections,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "max_connections".to_string(),
                reason: "Pool needs at least one connection".to_string(),
            });
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert("default_strategy".to_string(), ConfigSource::EnvVar("LOADING_STRATEGY".to_string()));
        sources.insert("log_queries".to_string(), ConfigSource::EnvVar("LOADING_LOG_QUERIES".to_string()));
        sources.insert(
            "max_connections".to_string(),
            ConfigSource::EnvVar("DATABASE_MAX_CONNECTIONS".to_string()),
        );
        sources
    }
}
