//! Uncompressed, appendable column storage.

use crate::types::{ChunkOffset, ColumnType};

/// Plain vector of values.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueColumn<T> {
    values: Vec<T>,
}

impl<T: ColumnType> ValueColumn<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn from_values(values: Vec<T>) -> Self {
        Self { values }
    }

    pub fn append(&mut self, value: T) {
        self.values.push(value);
    }

    pub fn get(&self, offset: ChunkOffset) -> Option<&T> {
        self.values.get(offset as usize)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: ColumnType> Default for ValueColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ColumnType> FromIterator<T> for ValueColumn<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
