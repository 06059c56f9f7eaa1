//! Tables: a schema plus an ordered list of chunks.

use std::sync::Arc;

use super::chunk::Chunk;
use super::column::Column;
use crate::error::Error;
use crate::types::{ChunkId, ColumnId, ColumnType, DataType, Value};

/// Name and type of one table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A columnar table.
///
/// Rows are appended to the last chunk until it holds `max_chunk_size` rows
/// (zero means unbounded), after which a new chunk is started. Tables produced
/// by operators are built once and then shared immutably behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Table {
    column_definitions: Vec<ColumnDefinition>,
    chunks: Vec<Chunk>,
    max_chunk_size: u32,
}

impl Table {
    pub fn new(max_chunk_size: u32) -> Self {
        Self {
            column_definitions: Vec::new(),
            chunks: Vec::new(),
            max_chunk_size,
        }
    }

    /// Create an empty table with the given columns.
    pub fn with_columns<I, S>(max_chunk_size: u32, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        Self {
            column_definitions: columns
                .into_iter()
                .map(|(name, data_type)| ColumnDefinition::new(name, data_type))
                .collect(),
            chunks: Vec::new(),
            max_chunk_size,
        }
    }

    /// Add a column to a table that holds no rows yet.
    pub fn add_column(&mut self, name: impl Into<String>, data_type: DataType) -> Result<(), Error> {
        if self.row_count() > 0 {
            return Err(Error::InvalidConfiguration(
                "columns can only be added to empty tables".to_string(),
            ));
        }
        self.column_definitions.push(ColumnDefinition::new(name, data_type));
        for chunk in &mut self.chunks {
            chunk.add_column(Arc::new(Column::new_value(data_type)));
        }
        Ok(())
    }

    /// Add a column to the schema only; chunks are expected to be emplaced later.
    ///
    /// Used for tables that are assembled from reference chunks.
    pub fn add_column_definition(&mut self, name: impl Into<String>, data_type: DataType) -> Result<(), Error> {
        if !self.chunks.is_empty() {
            return Err(Error::InvalidConfiguration(
                "column definitions can only be added to tables without chunks".to_string(),
            ));
        }
        self.column_definitions.push(ColumnDefinition::new(name, data_type));
        Ok(())
    }

    /// Append one row, starting a new chunk when the last one is full or frozen.
    pub fn append(&mut self, values: Vec<Value>) -> Result<(), Error> {
        let needs_chunk = match self.chunks.last() {
            None => true,
            Some(chunk) => {
                !chunk.is_mutable()
                    || (self.max_chunk_size > 0 && chunk.size() >= self.max_chunk_size as usize)
            }
        };
        if needs_chunk {
            self.chunks.push(self.new_value_chunk());
        }

        let result = match self.chunks.last_mut() {
            Some(chunk) => chunk.append(&values),
            None => Err(Error::ChunkNotFound(0)),
        };
        // A rejected row must not leave an empty chunk behind.
        if result.is_err() && needs_chunk {
            self.chunks.pop();
        }
        result
    }

    fn new_value_chunk(&self) -> Chunk {
        Chunk::from_columns(
            self.column_definitions
                .iter()
                .map(|definition| Arc::new(Column::new_value(definition.data_type)))
                .collect(),
        )
    }

    /// Add a fully built chunk. Its columns must match the schema.
    pub fn emplace_chunk(&mut self, chunk: Chunk) -> Result<(), Error> {
        if chunk.column_count() != self.column_count() {
            return Err(Error::InvalidConfiguration(format!(
                "chunk has {} columns but table has {}",
                chunk.column_count(),
                self.column_count()
            )));
        }
        for (column, definition) in chunk.columns().iter().zip(&self.column_definitions) {
            if column.data_type() != definition.data_type {
                return Err(Error::TypeMismatch {
                    expected: definition.data_type,
                    actual: column.data_type(),
                });
            }
        }
        self.chunks.push(chunk);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(Chunk::size).sum()
    }

    pub fn chunk_count(&self) -> ChunkId {
        self.chunks.len() as ChunkId
    }

    pub fn column_count(&self) -> usize {
        self.column_definitions.len()
    }

    pub fn max_chunk_size(&self) -> u32 {
        self.max_chunk_size
    }

    pub fn column_definitions(&self) -> &[ColumnDefinition] {
        &self.column_definitions
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.column_definitions
            .iter()
            .map(|definition| definition.name.as_str())
            .collect()
    }

    pub fn column_name(&self, column_id: ColumnId) -> Result<&str, Error> {
        self.definition(column_id).map(|definition| definition.name.as_str())
    }

    pub fn column_type(&self, column_id: ColumnId) -> Result<DataType, Error> {
        self.definition(column_id).map(|definition| definition.data_type)
    }

    pub fn column_id_by_name(&self, name: &str) -> Result<ColumnId, Error> {
        self.column_definitions
            .iter()
            .position(|definition| definition.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    fn definition(&self, column_id: ColumnId) -> Result<&ColumnDefinition, Error> {
        self.column_definitions
            .get(column_id)
            .ok_or_else(|| Error::ColumnNotFound(column_id.to_string()))
    }

    pub fn get_chunk(&self, chunk_id: ChunkId) -> Result<&Chunk, Error> {
        self.chunks
            .get(chunk_id as usize)
            .ok_or(Error::ChunkNotFound(chunk_id))
    }

    pub fn get_chunk_mut(&mut self, chunk_id: ChunkId) -> Result<&mut Chunk, Error> {
        self.chunks
            .get_mut(chunk_id as usize)
            .ok_or(Error::ChunkNotFound(chunk_id))
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Whether the table's chunks hold reference columns.
    pub fn is_reference_table(&self) -> bool {
        self.chunks.first().is_some_and(Chunk::is_reference)
    }

    /// Typed value at a table-wide row index.
    pub fn get_value<T: ColumnType>(&self, column_id: ColumnId, row: usize) -> Result<T, Error> {
        let data_type = self.column_type(column_id)?;
        if data_type != T::DATA_TYPE {
            return Err(T::type_mismatch(data_type));
        }

        let mut remaining = row;
        for chunk in &self.chunks {
            if remaining < chunk.size() {
                return chunk
                    .get_column(column_id)?
                    .typed_value_at::<T>(remaining as u32)?
                    .ok_or(Error::RowOutOfRange { column_id, row });
            }
            remaining -= chunk.size();
        }
        Err(Error::RowOutOfRange { column_id, row })
    }

    /// Type-erased value at a table-wide row index.
    pub fn value(&self, column_id: ColumnId, row: usize) -> Result<Value, Error> {
        self.column_type(column_id)?;
        let mut remaining = row;
        for chunk in &self.chunks {
            if remaining < chunk.size() {
                return chunk
                    .get_column(column_id)?
                    .value_at(remaining as u32)
                    .ok_or(Error::RowOutOfRange { column_id, row });
            }
            remaining -= chunk.size();
        }
        Err(Error::RowOutOfRange { column_id, row })
    }

    /// All rows in chunk order, type-erased.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>, Error> {
        let mut rows = Vec::with_capacity(self.row_count());
        for chunk in &self.chunks {
            for offset in 0..chunk.size() {
                let row = chunk
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(column_id, column)| {
                        column.value_at(offset as u32).ok_or(Error::RowOutOfRange {
                            column_id,
                            row: offset,
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                rows.push(row);
            }
        }
        Ok(rows)
    }
}
