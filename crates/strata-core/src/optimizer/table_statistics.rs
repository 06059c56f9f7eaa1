//! Table-level statistics built from per-column statistics.

use std::sync::Arc;

use parking_lot::Mutex;

use super::column_statistics::{AbstractColumnStatistics, ColumnStatistics, TableHandle};
use crate::error::Error;
use crate::storage::Table;
use crate::types::{AllParameterVariant, ColumnId, ScanType, Value};

/// Estimated row count plus lazily created statistics for every column.
///
/// Applying a predicate yields new `TableStatistics` with a scaled row count
/// and the filtered column's statistics replaced by the derived ones; the
/// remaining columns keep computing from the original table.
#[derive(Debug)]
pub struct TableStatistics {
    table: TableHandle,
    row_count: f32,
    column_statistics: Mutex<Vec<Option<Arc<dyn AbstractColumnStatistics>>>>,
}

impl TableStatistics {
    pub fn new(table: &Arc<Table>) -> Self {
        Self {
            table: TableHandle::new(table),
            row_count: table.row_count() as f32,
            column_statistics: Mutex::new(vec![None; table.column_count()]),
        }
    }

    /// Estimated number of rows.
    pub fn row_count(&self) -> f32 {
        self.row_count
    }

    /// Statistics of `column_id`, created on first use.
    pub fn column_statistics(&self, column_id: ColumnId) -> Result<Arc<dyn AbstractColumnStatistics>, Error> {
        let mut columns = self.column_statistics.lock();
        let slot = columns
            .get_mut(column_id)
            .ok_or_else(|| Error::ColumnNotFound(column_id.to_string()))?;
        if let Some(statistics) = slot {
            return Ok(Arc::clone(statistics));
        }

        let table = self.table.upgrade()?;
        let data_type = table.column_type(column_id)?;
        let statistics: Arc<dyn AbstractColumnStatistics> = crate::resolve_column_type!(data_type, ColumnT => {
            Arc::new(ColumnStatistics::<ColumnT>::new(column_id, &table)) as Arc<dyn AbstractColumnStatistics>
        });
        *slot = Some(Arc::clone(&statistics));
        Ok(statistics)
    }

    /// Statistics after filtering with `column <scan_type> value [AND value2]`.
    pub fn predicate_statistics(
        &self,
        column_id: ColumnId,
        scan_type: ScanType,
        value: &AllParameterVariant,
        value2: Option<&Value>,
    ) -> Result<TableStatistics, Error> {
        let selectivity = self
            .column_statistics(column_id)?
            .predicate_selectivity(scan_type, value, value2)?;

        let mut columns = self.column_statistics.lock().clone();
        if let Some(derived) = selectivity.column_statistics {
            columns[column_id] = Some(derived);
        }
        Ok(TableStatistics {
            table: self.table.clone(),
            row_count: self.row_count * selectivity.selectivity,
            column_statistics: Mutex::new(columns),
        })
    }

    /// Statistics after filtering with `left_column <scan_type> right_column`.
    pub fn column_predicate_statistics(
        &self,
        left_column_id: ColumnId,
        scan_type: ScanType,
        right_column_id: ColumnId,
        value2: Option<&Value>,
    ) -> Result<TableStatistics, Error> {
        let left = self.column_statistics(left_column_id)?;
        let right = self.column_statistics(right_column_id)?;
        let selectivity = left.two_column_predicate_selectivity(scan_type, right.as_ref(), value2)?;

        let mut columns = self.column_statistics.lock().clone();
        if let Some(derived) = selectivity.left_column_statistics {
            columns[left_column_id] = Some(derived);
        }
        if let Some(derived) = selectivity.right_column_statistics {
            columns[right_column_id] = Some(derived);
        }
        Ok(TableStatistics {
            table: self.table.clone(),
            row_count: self.row_count * selectivity.selectivity,
            column_statistics: Mutex::new(columns),
        })
    }
}
