//! # loadkit-core
//!
//! Environment-driven configuration and logging bootstrap shared by the
//! loadkit crates.

pub mod app_config;
pub mod logging;

pub use app_config::{
    get_env_optional, get_env_or_default, get_env_parsed, get_env_required, AppConfig,
    AppConfigTrait, ConfigError, ConfigSource, Environment, LoggingConfig,
};
pub use logging::init_logging;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
