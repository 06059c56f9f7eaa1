//! Columns that select rows of another table instead of copying them.

use std::collections::HashMap;
use std::sync::Arc;

use super::chunk::Chunk;
use super::column::Column;
use super::table::Table;
use crate::error::Error;
use crate::types::{ChunkOffset, ColumnId, ColumnType, DataType, PosList, Value};

/// A column whose row `i` is row `pos_list[i]` of `referenced_table`'s column.
///
/// The referenced table is always a data table: references are resolved
/// through when new reference columns are built on top of reference tables.
#[derive(Debug, Clone)]
pub struct ReferenceColumn {
    referenced_table: Arc<Table>,
    referenced_column_id: ColumnId,
    data_type: DataType,
    pos_list: Arc<PosList>,
}

impl ReferenceColumn {
    pub fn new(
        referenced_table: Arc<Table>,
        referenced_column_id: ColumnId,
        pos_list: Arc<PosList>,
    ) -> Result<Self, Error> {
        let data_type = referenced_table.column_type(referenced_column_id)?;
        Ok(Self {
            referenced_table,
            referenced_column_id,
            data_type,
            pos_list,
        })
    }

    pub fn referenced_table(&self) -> &Arc<Table> {
        &self.referenced_table
    }

    pub fn referenced_column_id(&self) -> ColumnId {
        self.referenced_column_id
    }

    pub fn pos_list(&self) -> &Arc<PosList> {
        &self.pos_list
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn len(&self) -> usize {
        self.pos_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_list.is_empty()
    }

    /// The referenced column and offset backing row `offset`.
    pub fn resolve(&self, offset: ChunkOffset) -> Option<(&Column, ChunkOffset)> {
        let row = self.pos_list.get(offset as usize)?;
        let chunk = self.referenced_table.get_chunk(row.chunk_id).ok()?;
        let column = chunk.get_column(self.referenced_column_id).ok()?;
        Some((column.as_ref(), row.chunk_offset))
    }

    pub fn value_at(&self, offset: ChunkOffset) -> Option<Value> {
        let (column, offset) = self.resolve(offset)?;
        column.value_at(offset)
    }

    /// Dereference every position in order.
    pub fn materialize<T: ColumnType>(&self) -> Result<Vec<T>, Error> {
        let mut values = Vec::with_capacity(self.pos_list.len());
        for (offset, row) in self.pos_list.iter().enumerate() {
            let column = self
                .referenced_table
                .get_chunk(row.chunk_id)?
                .get_column(self.referenced_column_id)?;
            let value = column
                .typed_value_at::<T>(row.chunk_offset)?
                .ok_or(Error::RowOutOfRange {
                    column_id: self.referenced_column_id,
                    row: offset,
                })?;
            values.push(value);
        }
        Ok(values)
    }
}

/// Reference columns selecting `positions` (rows of `input`) for every column of `input`.
///
/// If `input` is itself a reference table, positions are translated to the
/// underlying data table so references never chain. Columns that shared a
/// position list in `input` share one in the output.
pub fn reference_columns(input: &Arc<Table>, positions: &Arc<PosList>) -> Result<Vec<Arc<Column>>, Error> {
    if !input.is_reference_table() {
        return (0..input.column_count())
            .map(|column_id| {
                ReferenceColumn::new(Arc::clone(input), column_id, Arc::clone(positions))
                    .map(|column| Arc::new(Column::Reference(column)))
            })
            .collect();
    }

    let mut translated: HashMap<Vec<usize>, Arc<PosList>> = HashMap::new();
    let mut columns = Vec::with_capacity(input.column_count());

    for column_id in 0..input.column_count() {
        let references = input
            .chunks()
            .iter()
            .map(|chunk| {
                chunk
                    .get_column(column_id)?
                    .as_reference()
                    .ok_or_else(|| {
                        Error::InvalidConfiguration(format!(
                            "column {column_id} mixes reference and data chunks"
                        ))
                    })
            })
            .collect::<Result<Vec<&ReferenceColumn>, Error>>()?;

        let Some(first) = references.first() else {
            continue;
        };
        let referenced_table = Arc::clone(first.referenced_table());
        if references
            .iter()
            .any(|reference| !Arc::ptr_eq(reference.referenced_table(), &referenced_table))
        {
            return Err(Error::InvalidConfiguration(format!(
                "column {column_id} references more than one table"
            )));
        }

        let key: Vec<usize> = references
            .iter()
            .map(|reference| Arc::as_ptr(reference.pos_list()) as usize)
            .collect();
        let pos_list = match translated.get(&key) {
            Some(pos_list) => Arc::clone(pos_list),
            None => {
                let mut pos_list = PosList::with_capacity(positions.len());
                for row in positions.iter() {
                    let reference = references.get(row.chunk_id as usize).ok_or(Error::ChunkNotFound(row.chunk_id))?;
                    let target = reference
                        .pos_list()
                        .get(row.chunk_offset as usize)
                        .ok_or(Error::RowOutOfRange {
                            column_id,
                            row: row.chunk_offset as usize,
                        })?;
                    pos_list.push(*target);
                }
                let pos_list = Arc::new(pos_list);
                translated.insert(key, Arc::clone(&pos_list));
                pos_list
            }
        };

        columns.push(Arc::new(Column::Reference(ReferenceColumn::new(
            referenced_table,
            first.referenced_column_id(),
            pos_list,
        )?)));
    }

    Ok(columns)
}

/// A chunk of reference columns selecting `positions` of `input`.
pub fn reference_chunk(input: &Arc<Table>, positions: &Arc<PosList>) -> Result<Chunk, Error> {
    Ok(Chunk::from_columns(reference_columns(input, positions)?))
}
