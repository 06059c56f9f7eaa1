//! Leaf operator reading a table from the catalog.

use std::sync::Arc;

use crate::error::Error;
use crate::storage::{Catalog, Table};

/// Leaf operator that looks up a table by name at execution time.
#[derive(Debug, Clone)]
pub struct GetTable {
    catalog: Arc<Catalog>,
    table_name: String,
}

impl GetTable {
    pub fn new(catalog: Arc<Catalog>, table_name: impl Into<String>) -> Self {
        Self {
            catalog,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub(crate) fn on_execute(&self) -> Result<Arc<Table>, Error> {
        self.catalog.get_table(&self.table_name)
    }
}
