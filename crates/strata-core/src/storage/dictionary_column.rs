//! Immutable, dictionary-encoded column storage.
//!
//! The dictionary holds every distinct value of the column exactly once, in
//! ascending order, so a value id's order equals its value's order. Range
//! predicates can therefore be answered on value ids alone.

use std::cmp::Ordering;
use std::sync::Arc;

use super::attribute_vector::FittedAttributeVector;
use crate::types::{ChunkOffset, ColumnType, ValueId};

/// Sorted dictionary plus one value id per row.
#[derive(Debug, Clone)]
pub struct DictionaryColumn<T> {
    dictionary: Arc<Vec<T>>,
    attribute_vector: Arc<FittedAttributeVector>,
}

impl<T: ColumnType> DictionaryColumn<T> {
    /// Encode `values`, preserving row order.
    pub fn from_values(values: &[T]) -> Self {
        let mut dictionary = values.to_vec();
        dictionary.sort_unstable_by(T::total_cmp);
        dictionary.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);

        let mut attribute_vector =
            FittedAttributeVector::for_dictionary_size(dictionary.len(), values.len());
        for (offset, value) in values.iter().enumerate() {
            // Every value is in the dictionary, so the search always hits.
            let value_id = dictionary
                .binary_search_by(|entry| entry.total_cmp(value))
                .unwrap_or_else(|insert_at| insert_at);
            attribute_vector.set(offset, value_id as ValueId);
        }

        Self {
            dictionary: Arc::new(dictionary),
            attribute_vector: Arc::new(attribute_vector),
        }
    }

    /// Value stored at row `offset`.
    pub fn get(&self, offset: ChunkOffset) -> Option<&T> {
        let offset = offset as usize;
        if offset >= self.attribute_vector.len() {
            return None;
        }
        self.value_by_value_id(self.attribute_vector.get(offset))
    }

    pub fn value_by_value_id(&self, value_id: ValueId) -> Option<&T> {
        self.dictionary.get(value_id as usize)
    }

    /// Value id of `value`, `None` if the value does not occur in the column.
    pub fn find_value_id(&self, value: &T) -> Option<ValueId> {
        self.dictionary
            .binary_search_by(|entry| entry.total_cmp(value))
            .ok()
            .map(|id| id as ValueId)
    }

    /// First value id whose value is `>= value`; the dictionary size if there is none.
    pub fn lower_bound(&self, value: &T) -> ValueId {
        self.dictionary
            .partition_point(|entry| entry.total_cmp(value) == Ordering::Less) as ValueId
    }

    /// First value id whose value is `> value`; the dictionary size if there is none.
    pub fn upper_bound(&self, value: &T) -> ValueId {
        self.dictionary
            .partition_point(|entry| entry.total_cmp(value) != Ordering::Greater) as ValueId
    }

    pub fn unique_values_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn dictionary(&self) -> &[T] {
        &self.dictionary
    }

    pub fn attribute_vector(&self) -> &FittedAttributeVector {
        &self.attribute_vector
    }

    /// Decode all rows in order.
    pub fn materialize(&self) -> Vec<T> {
        self.attribute_vector
            .iter()
            .map(|value_id| self.dictionary[value_id as usize].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attribute_vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_vector.is_empty()
    }
}
