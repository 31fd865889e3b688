//! Error types for the loading system
//!
//! Every failure surfaces directly to the caller of a fetch. Nothing here is
//! retried.

use loadkit_core::ConfigError;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A singleton request matched nothing
    #[error("Record not found in table '{0}'")]
    NotFound(String),

    /// A singleton request matched more than one record
    #[error("Expected a single record from '{table}', found {count}")]
    AmbiguousSingleton { table: String, count: usize },

    /// A relationship path does not exist on the root type, or an explicit
    /// request names a nested path whose prefix it has not loaded earlier
    #[error("Invalid relationship path: {0}")]
    InvalidPath(String),

    /// A relation was read without having been populated
    #[error("Relationship '{0}' was not loaded")]
    NotLoaded(String),

    /// The storage collaborator cannot be reached
    #[error("Storage collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// The storage collaborator was reached but the query failed
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ModelError {
    /// Whether the error came from the collaborator being unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ModelError::CollaboratorUnavailable(_))
    }
}

// Connection-level sqlx failures mean the collaborator is out of reach;
// everything else is a failed query.
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                ModelError::CollaboratorUnavailable(err.to_string())
            }
            other => ModelError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}
