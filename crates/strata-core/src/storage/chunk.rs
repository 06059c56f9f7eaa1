//! Horizontal partitions of a table.

use std::sync::Arc;

use super::column::Column;
use crate::error::Error;
use crate::types::{ColumnId, Value};

/// A set of equally long columns, one per table column.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    columns: Vec<Arc<Column>>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Arc<Column>>) -> Self {
        debug_assert!(
            columns.windows(2).all(|pair| pair[0].len() == pair[1].len()),
            "chunk columns differ in length"
        );
        Self { columns }
    }

    pub fn add_column(&mut self, column: Arc<Column>) {
        debug_assert!(self.columns.is_empty() || self.size() == column.len());
        self.columns.push(column);
    }

    /// Swap in a new version of a column, e.g. its compressed form.
    pub fn replace_column(&mut self, column_id: ColumnId, column: Arc<Column>) -> Result<(), Error> {
        let slot = self
            .columns
            .get_mut(column_id)
            .ok_or_else(|| Error::ColumnNotFound(column_id.to_string()))?;
        *slot = column;
        Ok(())
    }

    /// Append one row. Only chunks made entirely of value columns accept rows.
    pub fn append(&mut self, values: &[Value]) -> Result<(), Error> {
        if values.len() != self.columns.len() {
            return Err(Error::InvalidConfiguration(format!(
                "row has {} values but chunk has {} columns",
                values.len(),
                self.columns.len()
            )));
        }

        // Validate the whole row first so a bad value never leaves a partial row behind.
        for (column, value) in self.columns.iter().zip(values) {
            if !matches!(column.as_ref(), Column::Value(_)) {
                return Err(Error::InvalidConfiguration(
                    "cannot append to a compressed or reference chunk".to_string(),
                ));
            }
            if column.data_type() != value.data_type() {
                return Err(Error::TypeMismatch {
                    expected: column.data_type(),
                    actual: value.data_type(),
                });
            }
        }

        for (column, value) in self.columns.iter_mut().zip(values) {
            if let Column::Value(typed) = Arc::make_mut(column) {
                typed.append(value)?;
            }
        }
        Ok(())
    }

    /// Whether rows can still be appended.
    pub fn is_mutable(&self) -> bool {
        self.columns
            .iter()
            .all(|column| matches!(column.as_ref(), Column::Value(_)))
    }

    pub fn is_reference(&self) -> bool {
        !self.columns.is_empty()
            && self
                .columns
                .iter()
                .all(|column| matches!(column.as_ref(), Column::Reference(_)))
    }

    pub fn get_column(&self, column_id: ColumnId) -> Result<&Arc<Column>, Error> {
        self.columns
            .get(column_id)
            .ok_or_else(|| Error::ColumnNotFound(column_id.to_string()))
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn size(&self) -> usize {
        self.columns.first().map_or(0, |column| column.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn chunk() -> Chunk {
        let mut chunk = Chunk::new();
        chunk.add_column(Arc::new(Column::new_value(DataType::Int)));
        chunk.add_column(Arc::new(Column::new_value(DataType::String)));
        chunk
    }

    #[test]
    fn test_append_rows() {
        let mut chunk = chunk();
        chunk.append(&[Value::Int(1), Value::from("a")]).unwrap();
        chunk.append(&[Value::Int(2), Value::from("b")]).unwrap();

        assert_eq!(chunk.size(), 2);
        assert_eq!(chunk.column_count(), 2);
        assert_eq!(chunk.get_column(1).unwrap().value_at(1), Some(Value::from("b")));
        assert!(chunk.is_mutable());
        assert!(!chunk.is_reference());
    }

    #[test]
    fn test_bad_row_leaves_chunk_unchanged() {
        let mut chunk = chunk();
        chunk.append(&[Value::Int(1), Value::from("a")]).unwrap();

        assert!(chunk.append(&[Value::Int(2), Value::Int(3)]).is_err());
        assert!(chunk.append(&[Value::Int(2)]).is_err());
        assert_eq!(chunk.size(), 1);
        assert_eq!(chunk.get_column(0).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(chunk().get_column(5), Err(Error::ColumnNotFound(_))));
    }
}
