//! In-memory storage collaborator
//!
//! Tables of JSON rows standing in for a relational store. Every successful
//! `query` or `join` counts as one round trip. The database can be switched
//! unavailable to exercise the unreachable-collaborator path, and it tracks
//! how many connections were acquired and released.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::error::{OrmError, OrmResult};
use crate::query::Filter;
use crate::record::Record;
use crate::relationships::{attach, ResolvedPath};
use crate::seeding::Dataset;
use super::core::{DatabaseBackendType, DatabaseConnection, DatabasePool, DatabasePoolStats};

#[derive(Debug, Default)]
struct MemoryState {
    tables: DashMap<String, Vec<Map<String, Value>>>,
    unavailable: AtomicBool,
    acquired: AtomicU64,
    released: AtomicU64,
    round_trips: AtomicU64,
}

impl MemoryState {
    fn ensure_available(&self) -> OrmResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OrmError::CollaboratorUnavailable(
                "in-memory database is switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn scan(&self, table: &str, filter: &Filter) -> OrmResult<Vec<Record>> {
        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| OrmError::Database(format!("relation \"{}\" does not exist", table)))?;

        Ok(rows
            .iter()
            .filter(|row| filter.matches(row))
            .map(|row| Record::new(table, row.clone()))
            .collect())
    }

    /// Recursive descent over the path tree. Each level scans its related
    /// table once, populates the candidates' own children, then attaches.
    fn populate(&self, records: &mut [Record], paths: &[ResolvedPath]) -> OrmResult<()> {
        for path in paths {
            let mut related = self.scan(&path.metadata.related_table, &path.filter)?;
            self.populate(&mut related, &path.children)?;
            attach(records.iter_mut().collect(), &path.metadata, &related);
        }
        Ok(())
    }
}

/// In-memory database; clones share the same tables and counters
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<MemoryState>,
}

impl MemoryDatabase {
    /// Empty database with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Database seeded from a validated dataset
    pub fn with_dataset(dataset: Dataset) -> OrmResult<Self> {
        let database = Self::new();
        database.seed(dataset)?;
        Ok(database)
    }

    /// Validate and load a dataset, replacing the tables it names
    pub fn seed(&self, dataset: Dataset) -> OrmResult<()> {
        dataset.validate()?;
        for (table, rows) in dataset.into_tables()? {
            self.create_table(table);
            for row in rows {
                self.insert(table, row)?;
            }
        }
        Ok(())
    }

    /// Create (or empty) a table
    pub fn create_table(&self, table: &str) {
        self.state.tables.insert(table.to_string(), Vec::new());
    }

    /// Append a row, creating the table on first use
    pub fn insert(&self, table: &str, row: Value) -> OrmResult<()> {
        let Value::Object(row) = row else {
            return Err(OrmError::Serialization(format!(
                "Rows for '{}' must be JSON objects",
                table
            )));
        };
        self.state.tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: &str) -> usize {
        self.state.tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    /// Switch the database on or off
    pub fn set_available(&self, available: bool) {
        self.state.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Round trips served over all connections
    pub fn round_trips(&self) -> u64 {
        self.state.round_trips.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabasePool for MemoryDatabase {
    async fn acquire(&self) -> OrmResult<Box<dyn DatabaseConnection>> {
        self.state.ensure_available()?;
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn stats(&self) -> DatabasePoolStats {
        DatabasePoolStats {
            acquired: self.state.acquired.load(Ordering::SeqCst),
            released: self.state.released.load(Ordering::SeqCst),
            round_trips: self.state.round_trips.load(Ordering::SeqCst),
        }
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::Memory
    }
}

/// Connection into a [`MemoryDatabase`]
pub struct MemoryConnection {
    state: Arc<MemoryState>,
}

#[async_trait]
impl DatabaseConnection for MemoryConnection {
    async fn query(&mut self, table: &str, filter: &Filter) -> OrmResult<Vec<Record>> {
        self.state.ensure_available()?;
        let records = self.state.scan(table, filter)?;
        self.state.round_trips.fetch_add(1, Ordering::SeqCst);
        Ok(records)
    }

    async fn join(&mut self, table: &str, paths: &[ResolvedPath], filter: &Filter) -> OrmResult<Vec<Record>> {
        self.state.ensure_available()?;
        let mut roots = self.state.scan(table, filter)?;
        self.state.populate(&mut roots, paths)?;
        self.state.round_trips.fetch_add(1, Ordering::SeqCst);
        Ok(roots)
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}
