//! Core error types.

use thiserror::Error;

use crate::types::{ChunkId, ColumnId, DataType};

/// Core engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A value or column was accessed with the wrong static type.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },

    /// An operation is not defined for the given type (e.g. SUM over strings).
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// Operator or algorithm was configured with invalid arguments.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Predicate is missing values or still contains unbound placeholders.
    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    /// Column id or name does not exist in the table.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Chunk id does not exist in the table.
    #[error("chunk {0} not found")]
    ChunkNotFound(ChunkId),

    /// Row index is beyond the end of the table or column.
    #[error("row {row} out of range for column {column_id}")]
    RowOutOfRange { column_id: ColumnId, row: usize },

    /// Table name is not registered in the catalog.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Table name is already registered in the catalog.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// The table backing a statistics object has been dropped.
    #[error("backing table of column statistics has been dropped")]
    TableDropped,

    /// Operator output requested before the operator executed.
    #[error("operator {0} has not been executed")]
    NotExecuted(&'static str),

    /// Spawning a worker thread failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

