//! Name-to-table registry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::table::Table;
use crate::error::Error;

/// Concurrent registry of named tables.
///
/// Operators resolve tables by name at execution time through
/// [`GetTable`](crate::operators::GetTable).
#[derive(Debug, Default)]
pub struct Catalog {
    tables: DashMap<String, Arc<Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table` under `name`. Fails if the name is taken.
    pub fn add_table(&self, name: impl Into<String>, table: Arc<Table>) -> Result<(), Error> {
        let name = name.into();
        match self.tables.entry(name) {
            Entry::Occupied(entry) => Err(Error::TableExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(table = %entry.key(), rows = table.row_count(), "Registered table");
                entry.insert(table);
                Ok(())
            }
        }
    }

    pub fn get_table(&self, name: &str) -> Result<Arc<Table>, Error> {
        self.tables
            .get(name)
            .map(|table| Arc::clone(table.value()))
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Unregister a table. Readers holding the `Arc` keep it alive.
    pub fn drop_table(&self, name: &str) -> Result<Arc<Table>, Error> {
        self.tables
            .remove(name)
            .map(|(_, table)| table)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Registered names in ascending order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Remove every table.
    pub fn reset(&self) {
        self.tables.clear();
    }
}
