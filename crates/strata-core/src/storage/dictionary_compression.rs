//! Conversion of value columns into dictionary columns.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::chunk::Chunk;
use super::column::Column;
use super::table::Table;
use crate::error::Error;
use crate::types::ChunkId;

/// Replaces value columns with their dictionary-encoded form.
///
/// Compression is idempotent: dictionary columns are left untouched.
pub struct DictionaryCompression;

impl DictionaryCompression {
    /// Compressed form of `column`, or `None` if it is already compressed.
    pub fn compress_column(column: &Column) -> Result<Option<Column>, Error> {
        match column {
            Column::Value(values) => Ok(Some(Column::Dictionary(values.to_dictionary()))),
            Column::Dictionary(_) => Ok(None),
            Column::Reference(_) => Err(Error::InvalidConfiguration(
                "reference columns cannot be compressed".to_string(),
            )),
        }
    }

    /// Compress every column of `chunk` in place.
    pub fn compress_chunk(chunk: &mut Chunk) -> Result<(), Error> {
        for column_id in 0..chunk.column_count() {
            let compressed = Self::compress_column(chunk.get_column(column_id)?)?;
            if let Some(compressed) = compressed {
                chunk.replace_column(column_id, Arc::new(compressed))?;
            }
        }
        Ok(())
    }

    /// Compress the given chunks of `table`.
    #[instrument(skip(table), fields(rows = table.row_count()))]
    pub fn compress_chunks(table: &mut Table, chunk_ids: &[ChunkId]) -> Result<(), Error> {
        for &chunk_id in chunk_ids {
            Self::compress_chunk(table.get_chunk_mut(chunk_id)?)?;
        }
        debug!(chunks = chunk_ids.len(), "Compressed chunks");
        Ok(())
    }

    /// Compress every chunk of `table`.
    pub fn compress_table(table: &mut Table) -> Result<(), Error> {
        let chunk_ids: Vec<ChunkId> = (0..table.chunk_count()).collect();
        Self::compress_chunks(table, &chunk_ids)
    }
}
