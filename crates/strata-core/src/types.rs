//! Scalar types shared by storage, operators and statistics.
//!
//! The engine is generic over a closed set of column value types. [`Value`] is
//! the type-erased scalar used at API boundaries; [`ColumnType`] is the sealed
//! trait implemented by the five Rust types backing columns, so that hot paths
//! are monomorphized once the concrete type has been resolved with
//! [`resolve_column_type!`](crate::resolve_column_type).

use std::cmp::Ordering;
use std::fmt;

use crate::error::Error;
use crate::storage::{
    DictionaryColumn, TypedDictionaryColumn, TypedValueColumn, ValueColumn,
};

/// Index of a column within a table schema.
pub type ColumnId = usize;
/// Index of a chunk within a table.
pub type ChunkId = u32;
/// Row index within a chunk.
pub type ChunkOffset = u32;
/// Index into a dictionary column's dictionary.
pub type ValueId = u32;

/// Position of a row: chunk plus offset within the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId {
    pub chunk_id: ChunkId,
    pub chunk_offset: ChunkOffset,
}

impl RowId {
    pub fn new(chunk_id: ChunkId, chunk_offset: ChunkOffset) -> Self {
        Self {
            chunk_id,
            chunk_offset,
        }
    }
}

/// Ordered list of row positions, shared by reference columns.
pub type PosList = Vec<RowId>;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// UTF-8 string.
    String,
}

impl DataType {
    /// Type name as used in table definitions.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
        }
    }

    /// Whether arithmetic aggregates (SUM, AVG) are defined for this type.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::String)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type-erased scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    /// The semantic type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
        }
    }

    /// The value every aggregate over an empty input falls back to.
    pub fn zero(data_type: DataType) -> Self {
        match data_type {
            DataType::Int => Value::Int(0),
            DataType::Long => Value::Long(0),
            DataType::Float => Value::Float(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::String => Value::String(String::new()),
        }
    }

    /// Compare two values of the same type.
    ///
    /// Returns `None` for values of different types; there is no implicit coercion.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Double(a), Value::Double(b)) => Some(a.total_cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Numeric view of the value, `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Comparison applied by table scans and selectivity estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Between,
}

impl ScanType {
    /// SQL-style operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            ScanType::Equals => "=",
            ScanType::NotEquals => "!=",
            ScanType::LessThan => "<",
            ScanType::LessThanEquals => "<=",
            ScanType::GreaterThan => ">",
            ScanType::GreaterThanEquals => ">=",
            ScanType::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parameter slot of a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValuePlaceholder {
    index: u16,
}

impl ValuePlaceholder {
    pub fn new(index: u16) -> Self {
        Self { index }
    }

    /// Position of the parameter in the bound parameter list.
    pub fn index(&self) -> u16 {
        self.index
    }
}

/// Either a concrete comparison value or a placeholder bound later.
#[derive(Debug, Clone, PartialEq)]
pub enum AllParameterVariant {
    Value(Value),
    Placeholder(ValuePlaceholder),
}

impl AllParameterVariant {
    /// Replace a placeholder with its bound parameter.
    pub fn bind(&self, parameters: &[Value]) -> Result<AllParameterVariant, Error> {
        match self {
            AllParameterVariant::Value(_) => Ok(self.clone()),
            AllParameterVariant::Placeholder(placeholder) => parameters
                .get(placeholder.index() as usize)
                .cloned()
                .map(AllParameterVariant::Value)
                .ok_or_else(|| {
                    Error::MalformedPredicate(format!(
                        "no parameter bound for placeholder {}",
                        placeholder.index()
                    ))
                }),
        }
    }
}

impl From<Value> for AllParameterVariant {
    fn from(value: Value) -> Self {
        AllParameterVariant::Value(value)
    }
}

impl From<ValuePlaceholder> for AllParameterVariant {
    fn from(placeholder: ValuePlaceholder) -> Self {
        AllParameterVariant::Placeholder(placeholder)
    }
}

mod private {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for String {}
}

/// Rust type backing a column of one [`DataType`].
pub trait ColumnType:
    Clone + fmt::Debug + PartialOrd + Send + Sync + 'static + private::Sealed
{
    /// Semantic type of columns holding this type.
    const DATA_TYPE: DataType;
    /// Whether the domain is integral (exact successor/predecessor exist).
    const IS_INTEGRAL: bool;
    /// Whether values can be interpolated linearly.
    const IS_NUMERIC: bool;

    /// Typed view of a [`Value`], `None` if the value has another type.
    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;

    /// Total order used for sorting, dictionaries and predicates.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Cluster id for radix clustering on the low bits of the value.
    fn radix(&self, mask: u32) -> u32;

    /// Numeric view for selectivity interpolation, `None` for text.
    fn to_f64(&self) -> Option<f64>;

    /// Next smaller value of an integral domain.
    fn predecessor(&self) -> Option<Self>;

    /// Next larger value of an integral domain.
    fn successor(&self) -> Option<Self>;

    fn value_column(column: &TypedValueColumn) -> Option<&ValueColumn<Self>>;

    fn dictionary_column(column: &TypedDictionaryColumn) -> Option<&DictionaryColumn<Self>>;

    fn wrap_value_column(column: ValueColumn<Self>) -> TypedValueColumn;

    fn wrap_dictionary_column(column: DictionaryColumn<Self>) -> TypedDictionaryColumn;

    /// Error for an access with this type to data of type `actual`.
    fn type_mismatch(actual: DataType) -> Error {
        Error::TypeMismatch {
            expected: Self::DATA_TYPE,
            actual,
        }
    }
}

macro_rules! column_plumbing {
    ($variant:ident) => {
        fn from_value(value: &Value) -> Option<Self> {
            match value {
                Value::$variant(v) => Some(v.clone()),
                _ => None,
            }
        }

        fn into_value(self) -> Value {
            Value::$variant(self)
        }

        fn value_column(column: &TypedValueColumn) -> Option<&ValueColumn<Self>> {
            match column {
                TypedValueColumn::$variant(c) => Some(c),
                _ => None,
            }
        }

        fn dictionary_column(column: &TypedDictionaryColumn) -> Option<&DictionaryColumn<Self>> {
            match column {
                TypedDictionaryColumn::$variant(c) => Some(c),
                _ => None,
            }
        }

        fn wrap_value_column(column: ValueColumn<Self>) -> TypedValueColumn {
            TypedValueColumn::$variant(column)
        }

        fn wrap_dictionary_column(column: DictionaryColumn<Self>) -> TypedDictionaryColumn {
            TypedDictionaryColumn::$variant(column)
        }
    };
}

impl ColumnType for i32 {
    const DATA_TYPE: DataType = DataType::Int;
    const IS_INTEGRAL: bool = true;
    const IS_NUMERIC: bool = true;

    column_plumbing!(Int);

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn radix(&self, mask: u32) -> u32 {
        (*self as u32) & mask
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }

    fn predecessor(&self) -> Option<Self> {
        self.checked_sub(1)
    }

    fn successor(&self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl ColumnType for i64 {
    const DATA_TYPE: DataType = DataType::Long;
    const IS_INTEGRAL: bool = true;
    const IS_NUMERIC: bool = true;

    column_plumbing!(Long);

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn radix(&self, mask: u32) -> u32 {
        (*self as u32) & mask
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }

    fn predecessor(&self) -> Option<Self> {
        self.checked_sub(1)
    }

    fn successor(&self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl ColumnType for f32 {
    const DATA_TYPE: DataType = DataType::Float;
    const IS_INTEGRAL: bool = false;
    const IS_NUMERIC: bool = true;

    column_plumbing!(Float);

    fn total_cmp(&self, other: &Self) -> Ordering {
        f32::total_cmp(self, other)
    }

    // Integral part only: the low mantissa bits of round numbers are all zero.
    fn radix(&self, mask: u32) -> u32 {
        ((*self as i64) as u32) & mask
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self as f64)
    }

    fn predecessor(&self) -> Option<Self> {
        None
    }

    fn successor(&self) -> Option<Self> {
        None
    }
}

impl ColumnType for f64 {
    const DATA_TYPE: DataType = DataType::Double;
    const IS_INTEGRAL: bool = false;
    const IS_NUMERIC: bool = true;

    column_plumbing!(Double);

    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }

    fn radix(&self, mask: u32) -> u32 {
        ((*self as i64) as u32) & mask
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }

    fn predecessor(&self) -> Option<Self> {
        None
    }

    fn successor(&self) -> Option<Self> {
        None
    }
}

impl ColumnType for String {
    const DATA_TYPE: DataType = DataType::String;
    const IS_INTEGRAL: bool = false;
    const IS_NUMERIC: bool = false;

    column_plumbing!(String);

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    // First four bytes, little-endian, zero padded.
    fn radix(&self, mask: u32) -> u32 {
        let mut prefix = [0u8; 4];
        for (slot, byte) in prefix.iter_mut().zip(self.as_bytes()) {
            *slot = *byte;
        }
        u32::from_le_bytes(prefix) & mask
    }

    fn to_f64(&self) -> Option<f64> {
        None
    }

    fn predecessor(&self) -> Option<Self> {
        None
    }

    fn successor(&self) -> Option<Self> {
        None
    }
}

/// Resolve a runtime [`DataType`] to its Rust type and evaluate `$body` with
/// `$t` bound to that type.
///
/// ```ignore
/// let rows = resolve_column_type!(data_type, ColumnT => scan::<ColumnT>(&table))?;
/// ```
#[macro_export]
macro_rules! resolve_column_type {
    ($data_type:expr, $t:ident => $body:expr) => {
        match $data_type {
            $crate::types::DataType::Int => {
                type $t = i32;
                $body
            }
            $crate::types::DataType::Long => {
                type $t = i64;
                $body
            }
            $crate::types::DataType::Float => {
                type $t = f32;
                $body
            }
            $crate::types::DataType::Double => {
                type $t = f64;
                $body
            }
            $crate::types::DataType::String => {
                type $t = String;
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_compare_same_type_only() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).compare(&Value::Long(1)), None);
    }

    #[test]
    fn test_radix_uses_low_bits() {
        assert_eq!(5i32.radix(0b11), 1);
        assert_eq!(7i64.radix(0b11), 3);
        assert_eq!(6.9f64.radix(0b11), 2);
        assert_eq!("ab".to_string().radix(0xFFFF), u32::from_le_bytes([b'a', b'b', 0, 0]));
        // Negative values keep their two's complement low bits.
        assert_eq!((-1i32).radix(0b111), 0b111);
    }

    #[test]
    fn test_from_value_rejects_other_types() {
        assert_eq!(i32::from_value(&Value::Int(3)), Some(3));
        assert_eq!(i32::from_value(&Value::Long(3)), None);
        assert!(matches!(
            i32::type_mismatch(DataType::Long),
            Error::TypeMismatch {
                expected: DataType::Int,
                actual: DataType::Long
            }
        ));
    }

    #[test]
    fn test_placeholder_binding() {
        let param = AllParameterVariant::from(ValuePlaceholder::new(1));
        let bound = param.bind(&[Value::Int(1), Value::Int(7)]).unwrap();
        assert_eq!(bound, AllParameterVariant::Value(Value::Int(7)));

        let err = param.bind(&[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, Error::MalformedPredicate(_)));
    }

    #[test]
    fn test_resolve_column_type() {
        fn type_of<T: ColumnType>() -> DataType {
            T::DATA_TYPE
        }
        for data_type in [
            DataType::Int,
            DataType::Long,
            DataType::Float,
            DataType::Double,
            DataType::String,
        ] {
            let resolved = crate::resolve_column_type!(data_type, ColumnT => type_of::<ColumnT>());
            assert_eq!(resolved, data_type);
        }
    }
}
