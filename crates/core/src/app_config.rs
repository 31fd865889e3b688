use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration trait for environment-driven configuration sections
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    EnvVar(String),
    Default(String),
    Nested,
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    /// Storage collaborator URL. `None` selects the in-memory database.
    pub database_url: Option<String>,
    /// JSON dataset used to seed the in-memory database
    pub dataset_path: Option<String>,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl AppConfig {
    /// Whether the in-memory database should stand in for a real collaborator
    pub fn uses_memory_backend(&self) -> bool {
        match &self.database_url {
            None => true,
            Some(url) => {
                let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or(url);
                matches!(scheme.to_lowercase().as_str(), "memory" | "mem")
            }
        }
    }
}

impl AppConfigTrait for AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let name = get_env_or_default("APP_NAME", "loadkit")?;
        let environment = get_env_or_default("APP_ENV", "development")?;
        let environment = Environment::from_str(&environment)?;

        let database_url = match environment {
            Environment::Production => Some(get_env_required("DATABASE_URL")?),
            _ => get_env_optional("DATABASE_URL"),
        };
        let dataset_path = get_env_optional("DATASET_PATH");

        let logging = LoggingConfig::from_env()?;

        Ok(AppConfig {
            name,
            environment,
            database_url,
            dataset_path,
            logging,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "name".to_string(),
                reason: "App name cannot be empty".to_string(),
            });
        }

        if let Some(url) = &self.database_url {
            if url.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "database_url".to_string(),
                    reason: "Database URL cannot be empty when set".to_string(),
                });
            }
        }

        // The in-memory database is a stand-in, never a production store
        if self.environment == Environment::Production && self.uses_memory_backend() {
            return Err(ConfigError::ValidationFailed {
                field: "database_url".to_string(),
                reason: "A real database URL is required in production".to_string(),
            });
        }

        self.logging.validate()?;

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert("name".to_string(), ConfigSource::EnvVar("APP_NAME".to_string()));
        sources.insert("environment".to_string(), ConfigSource::EnvVar("APP_ENV".to_string()));
        sources.insert(
            "database_url".to_string(),
            match self.database_url {
                Some(_) => ConfigSource::EnvVar("DATABASE_URL".to_string()),
                None => ConfigSource::Default("in-memory".to_string()),
            },
        );
        sources.insert("dataset_path".to_string(), ConfigSource::EnvVar("DATASET_PATH".to_string()));
        sources.insert("logging".to_string(), ConfigSource::Nested);
        sources
    }
}

impl AppConfigTrait for LoggingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let level = get_env_or_default("LOG_LEVEL", "info")?;
        let format = get_env_or_default("LOG_FORMAT", "compact")?;

        Ok(LoggingConfig { level, format })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "level".to_string(),
                value: self.level.clone(),
                expected: "trace, debug, info, warn, or error".to_string(),
            });
        }

        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "format".to_string(),
                value: self.format.clone(),
                expected: "compact, pretty, or json".to_string(),
            });
        }

        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert("level".to_string(), ConfigSource::EnvVar("LOG_LEVEL".to_string()));
        sources.insert("format".to_string(), ConfigSource::EnvVar("LOG_FORMAT".to_string()));
        sources
    }
}

// Helper functions for environment variable handling

/// Read a variable that must be present
pub fn get_env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar {
        var: key.to_string(),
    })
}

/// Read a variable, treating absence as `None`
pub fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Read a variable, falling back to `default`
pub fn get_env_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

/// Read a variable and parse it, reporting the field name on failure
pub fn get_env_parsed<T: FromStr>(
    key: &str,
    field: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    let raw = get_env_or_default(key, default)?;
    raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw,
        expected: expected.to_string(),
    })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("Invalid value for {field}: '{value}', expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    ValidationFailed { field: String, reason: String },
}
