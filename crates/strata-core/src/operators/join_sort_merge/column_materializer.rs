//! Materialization of join columns into (value, row) lists.

use std::sync::Arc;

use crate::error::Error;
use crate::scheduler::CurrentScheduler;
use crate::storage::Table;
use crate::types::{ChunkId, ChunkOffset, ColumnId, ColumnType, RowId};

/// A join key together with the row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedValue<T> {
    pub value: T,
    pub row_id: RowId,
}

impl<T> MaterializedValue<T> {
    pub fn new(value: T, row_id: RowId) -> Self {
        Self { value, row_id }
    }
}

/// Materialized values of one chunk or one cluster.
pub type MaterializedColumn<T> = Vec<MaterializedValue<T>>;

/// One materialized list per chunk or per cluster.
pub type MaterializedColumnList<T> = Vec<MaterializedColumn<T>>;

/// Total number of values across all lists.
pub(crate) fn materialized_size<T>(list: &MaterializedColumnList<T>) -> usize {
    list.iter().map(Vec::len).sum()
}

/// Copies a column out of its table into `(value, row)` pairs, one task per chunk.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMaterializer {
    sort: bool,
}

impl ColumnMaterializer {
    /// With `sort`, each chunk's list is sorted by value.
    pub fn new(sort: bool) -> Self {
        Self { sort }
    }

    pub fn materialize<T: ColumnType>(
        &self,
        table: &Arc<Table>,
        column_id: ColumnId,
    ) -> Result<MaterializedColumnList<T>, Error> {
        let data_type = table.column_type(column_id)?;
        if data_type != T::DATA_TYPE {
            return Err(T::type_mismatch(data_type));
        }

        let sort = self.sort;
        let chunks = CurrentScheduler::run_all((0..table.chunk_count()).map(|chunk_id| {
            let table = Arc::clone(table);
            move || materialize_chunk::<T>(&table, chunk_id, column_id, sort)
        }));
        chunks.into_iter().collect()
    }
}

fn materialize_chunk<T: ColumnType>(
    table: &Table,
    chunk_id: ChunkId,
    column_id: ColumnId,
    sort: bool,
) -> Result<MaterializedColumn<T>, Error> {
    let values = table.get_chunk(chunk_id)?.get_column(column_id)?.materialize::<T>()?;
    let mut output: MaterializedColumn<T> = values
        .into_iter()
        .enumerate()
        .map(|(offset, value)| MaterializedValue::new(value, RowId::new(chunk_id, offset as ChunkOffset)))
        .collect();
    if sort {
        output.sort_by(|a, b| a.value.total_cmp(&b.value));
    }
    Ok(output)
}
