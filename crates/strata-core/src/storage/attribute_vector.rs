//! Width-fitted storage for the value ids of a dictionary column.

use crate::types::ValueId;

/// Value ids stored in the narrowest unsigned integer that holds the dictionary size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FittedAttributeVector {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl FittedAttributeVector {
    /// Create a zero-filled vector of `len` entries wide enough for `unique_values` ids.
    pub fn for_dictionary_size(unique_values: usize, len: usize) -> Self {
        if unique_values <= u8::MAX as usize + 1 {
            FittedAttributeVector::U8(vec![0; len])
        } else if unique_values <= u16::MAX as usize + 1 {
            FittedAttributeVector::U16(vec![0; len])
        } else {
            FittedAttributeVector::U32(vec![0; len])
        }
    }

    /// Value id at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> ValueId {
        match self {
            FittedAttributeVector::U8(ids) => ids[index] as ValueId,
            FittedAttributeVector::U16(ids) => ids[index] as ValueId,
            FittedAttributeVector::U32(ids) => ids[index],
        }
    }

    /// Store `value_id` at `index`. The id must fit the vector's width.
    pub fn set(&mut self, index: usize, value_id: ValueId) {
        match self {
            FittedAttributeVector::U8(ids) => {
                debug_assert!(value_id <= u8::MAX as ValueId);
                ids[index] = value_id as u8;
            }
            FittedAttributeVector::U16(ids) => {
                debug_assert!(value_id <= u16::MAX as ValueId);
                ids[index] = value_id as u16;
            }
            FittedAttributeVector::U32(ids) => ids[index] = value_id,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FittedAttributeVector::U8(ids) => ids.len(),
            FittedAttributeVector::U16(ids) => ids.len(),
            FittedAttributeVector::U32(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per stored value id.
    pub fn width(&self) -> usize {
        match self {
            FittedAttributeVector::U8(_) => 1,
            FittedAttributeVector::U16(_) => 2,
            FittedAttributeVector::U32(_) => 4,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueId> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_follows_dictionary_size() {
        assert_eq!(FittedAttributeVector::for_dictionary_size(1, 4).width(), 1);
        assert_eq!(FittedAttributeVector::for_dictionary_size(256, 4).width(), 1);
        assert_eq!(FittedAttributeVector::for_dictionary_size(257, 4).width(), 2);
        assert_eq!(FittedAttributeVector::for_dictionary_size(65_536, 4).width(), 2);
        assert_eq!(FittedAttributeVector::for_dictionary_size(65_537, 4).width(), 4);
    }

    #[test]
    fn test_set_and_get() {
        let mut ids = FittedAttributeVector::for_dictionary_size(300, 3);
        ids.set(0, 299);
        ids.set(2, 7);
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec![299, 0, 7]);
    }
}
