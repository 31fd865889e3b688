//! Storage Backends
//!
//! The loading strategies only see [`DatabasePool`] and [`DatabaseConnection`].
//! Two implementations ship: an in-memory database seeded from a dataset,
//! and PostgreSQL through sqlx.

pub mod core;
pub mod memory;
pub mod postgres;

pub use core::*;
pub use memory::{MemoryConnection, MemoryDatabase};
pub use postgres::{PostgresConnection, PostgresPool};
