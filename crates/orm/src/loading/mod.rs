//! Relationship loading strategies
//!
//! [`LoadingStrategyRunner`] opens [`Session`]s over a storage pool and
//! fetches [`FetchRequest`]s lazily, eagerly, or explicitly.

pub mod config;
pub mod request;
pub mod runner;
pub mod session;
pub mod strategy;

pub use config::LoadingConfig;
pub use request::FetchRequest;
pub use runner::{FetchOutcome, LoadingStrategyRunner, StrategyReport};
pub use session::{QueryLogEntry, RoundTripKind, Session};
pub use strategy::LoadingStrategy;
