//! The column variants a chunk can hold.

use super::dictionary_column::DictionaryColumn;
use super::reference_column::ReferenceColumn;
use super::value_column::ValueColumn;
use crate::error::Error;
use crate::types::{ChunkOffset, ColumnType, DataType, Value};

macro_rules! for_each_variant {
    ($enum:ident, $self:expr, $column:ident => $body:expr) => {
        match $self {
            $enum::Int($column) => $body,
            $enum::Long($column) => $body,
            $enum::Float($column) => $body,
            $enum::Double($column) => $body,
            $enum::String($column) => $body,
        }
    };
}

/// A value column of any supported type.
#[derive(Debug, Clone)]
pub enum TypedValueColumn {
    Int(ValueColumn<i32>),
    Long(ValueColumn<i64>),
    Float(ValueColumn<f32>),
    Double(ValueColumn<f64>),
    String(ValueColumn<String>),
}

impl TypedValueColumn {
    /// Empty column of `data_type`.
    pub fn new(data_type: DataType) -> Self {
        match data_type {
            DataType::Int => TypedValueColumn::Int(ValueColumn::new()),
            DataType::Long => TypedValueColumn::Long(ValueColumn::new()),
            DataType::Float => TypedValueColumn::Float(ValueColumn::new()),
            DataType::Double => TypedValueColumn::Double(ValueColumn::new()),
            DataType::String => TypedValueColumn::String(ValueColumn::new()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            TypedValueColumn::Int(_) => DataType::Int,
            TypedValueColumn::Long(_) => DataType::Long,
            TypedValueColumn::Float(_) => DataType::Float,
            TypedValueColumn::Double(_) => DataType::Double,
            TypedValueColumn::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        for_each_variant!(TypedValueColumn, self, column => column.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_at(&self, offset: ChunkOffset) -> Option<Value> {
        for_each_variant!(TypedValueColumn, self, column => {
            column.get(offset).cloned().map(ColumnType::into_value)
        })
    }

    /// Append a value of the column's exact type.
    pub fn append(&mut self, value: &Value) -> Result<(), Error> {
        match (self, value) {
            (TypedValueColumn::Int(column), Value::Int(v)) => column.append(*v),
            (TypedValueColumn::Long(column), Value::Long(v)) => column.append(*v),
            (TypedValueColumn::Float(column), Value::Float(v)) => column.append(*v),
            (TypedValueColumn::Double(column), Value::Double(v)) => column.append(*v),
            (TypedValueColumn::String(column), Value::String(v)) => column.append(v.clone()),
            (column, value) => {
                return Err(Error::TypeMismatch {
                    expected: column.data_type(),
                    actual: value.data_type(),
                })
            }
        }
        Ok(())
    }

    /// Dictionary-encode the column.
    pub fn to_dictionary(&self) -> TypedDictionaryColumn {
        match self {
            TypedValueColumn::Int(c) => TypedDictionaryColumn::Int(DictionaryColumn::from_values(c.values())),
            TypedValueColumn::Long(c) => TypedDictionaryColumn::Long(DictionaryColumn::from_values(c.values())),
            TypedValueColumn::Float(c) => TypedDictionaryColumn::Float(DictionaryColumn::from_values(c.values())),
            TypedValueColumn::Double(c) => TypedDictionaryColumn::Double(DictionaryColumn::from_values(c.values())),
            TypedValueColumn::String(c) => TypedDictionaryColumn::String(DictionaryColumn::from_values(c.values())),
        }
    }
}

/// A dictionary column of any supported type.
#[derive(Debug, Clone)]
pub enum TypedDictionaryColumn {
    Int(DictionaryColumn<i32>),
    Long(DictionaryColumn<i64>),
    Float(DictionaryColumn<f32>),
    Double(DictionaryColumn<f64>),
    String(DictionaryColumn<String>),
}

impl TypedDictionaryColumn {
    pub fn data_type(&self) -> DataType {
        match self {
            TypedDictionaryColumn::Int(_) => DataType::Int,
            TypedDictionaryColumn::Long(_) => DataType::Long,
            TypedDictionaryColumn::Float(_) => DataType::Float,
            TypedDictionaryColumn::Double(_) => DataType::Double,
            TypedDictionaryColumn::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        for_each_variant!(TypedDictionaryColumn, self, column => column.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unique_values_count(&self) -> usize {
        for_each_variant!(TypedDictionaryColumn, self, column => column.unique_values_count())
    }

    pub fn value_at(&self, offset: ChunkOffset) -> Option<Value> {
        for_each_variant!(TypedDictionaryColumn, self, column => {
            column.get(offset).cloned().map(ColumnType::into_value)
        })
    }
}

/// One column of one chunk.
#[derive(Debug, Clone)]
pub enum Column {
    /// Mutable, uncompressed values.
    Value(TypedValueColumn),
    /// Immutable, dictionary-encoded values.
    Dictionary(TypedDictionaryColumn),
    /// Rows of another table's column, selected by a position list.
    Reference(ReferenceColumn),
}

impl Column {
    /// Empty value column of `data_type`.
    pub fn new_value(data_type: DataType) -> Self {
        Column::Value(TypedValueColumn::new(data_type))
    }

    pub fn from_values<T: ColumnType>(values: Vec<T>) -> Self {
        Column::Value(T::wrap_value_column(ValueColumn::from_values(values)))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Value(column) => column.data_type(),
            Column::Dictionary(column) => column.data_type(),
            Column::Reference(column) => column.data_type(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Value(column) => column.len(),
            Column::Dictionary(column) => column.len(),
            Column::Reference(column) => column.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_reference(&self) -> Option<&ReferenceColumn> {
        match self {
            Column::Reference(column) => Some(column),
            _ => None,
        }
    }

    /// Type-erased value at `offset`, `None` past the end.
    pub fn value_at(&self, offset: ChunkOffset) -> Option<Value> {
        match self {
            Column::Value(column) => column.value_at(offset),
            Column::Dictionary(column) => column.value_at(offset),
            Column::Reference(column) => column.value_at(offset),
        }
    }

    /// Typed value at `offset`.
    ///
    /// Fails if `T` is not the column's type; returns `Ok(None)` past the end.
    pub fn typed_value_at<T: ColumnType>(&self, offset: ChunkOffset) -> Result<Option<T>, Error> {
        let mismatch = || T::type_mismatch(self.data_type());
        match self {
            Column::Value(column) => {
                let column = T::value_column(column).ok_or_else(mismatch)?;
                Ok(column.get(offset).cloned())
            }
            Column::Dictionary(column) => {
                let column = T::dictionary_column(column).ok_or_else(mismatch)?;
                Ok(column.get(offset).cloned())
            }
            Column::Reference(column) => match column.resolve(offset) {
                Some((referenced, referenced_offset)) => referenced.typed_value_at(referenced_offset),
                None => Ok(None),
            },
        }
    }

    /// All values of the column in row order.
    pub fn materialize<T: ColumnType>(&self) -> Result<Vec<T>, Error> {
        let mismatch = || T::type_mismatch(self.data_type());
        match self {
            Column::Value(column) => Ok(T::value_column(column).ok_or_else(mismatch)?.values().to_vec()),
            Column::Dictionary(column) => Ok(T::dictionary_column(column).ok_or_else(mismatch)?.materialize()),
            Column::Reference(column) => column.materialize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_checks_type() {
        let mut column = TypedValueColumn::new(DataType::Int);
        column.append(&Value::Int(4)).unwrap();
        let err = column.append(&Value::from("four")).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: DataType::Int,
                actual: DataType::String
            }
        ));
        assert_eq!(column.len(), 1);
    }

    #[test]
    fn test_typed_access() {
        let column = Column::from_values(vec![1.5f32, 2.5]);
        assert_eq!(column.data_type(), DataType::Float);
        assert_eq!(column.typed_value_at::<f32>(1).unwrap(), Some(2.5));
        assert_eq!(column.typed_value_at::<f32>(2).unwrap(), None);
        assert!(column.typed_value_at::<f64>(0).is_err());
        assert_eq!(column.value_at(0), Some(Value::Float(1.5)));
    }

    #[test]
    fn test_dictionary_and_value_agree() {
        let values = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        let plain = Column::from_values(values.clone());
        let Column::Value(typed) = &plain else {
            unreachable!()
        };
        let encoded = Column::Dictionary(typed.to_dictionary());

        for offset in 0..3 {
            assert_eq!(plain.value_at(offset), encoded.value_at(offset));
        }
        assert_eq!(encoded.materialize::<String>().unwrap(), values);
    }
}
