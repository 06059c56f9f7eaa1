//! Leaf operator wrapping an existing table.

use std::sync::Arc;

use crate::error::Error;
use crate::storage::Table;

/// Leaf operator that outputs a table it was given.
#[derive(Debug, Clone)]
pub struct TableWrapper {
    table: Arc<Table>,
}

impl TableWrapper {
    pub fn new(table: Arc<Table>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub(crate) fn on_execute(&self) -> Result<Arc<Table>, Error> {
        Ok(Arc::clone(&self.table))
    }
}
