//! Filtering of a table by comparing one column against a value.

use std::cmp::Ordering;
use std::sync::Arc;

use super::Operator;
use crate::error::Error;
use crate::storage::{reference_chunk, Column, DictionaryColumn, Table};
use crate::types::{
    AllParameterVariant, ChunkId, ChunkOffset, ColumnId, ColumnType, PosList, RowId, ScanType,
    Value, ValueId,
};

/// Filters rows by comparing one column against a constant.
///
/// The output is a reference table over the input's data: one output chunk per
/// input chunk that has at least one match.
#[derive(Debug, Clone)]
pub struct TableScan {
    input: Arc<Operator>,
    column_id: ColumnId,
    scan_type: ScanType,
    value: AllParameterVariant,
    value2: Option<Value>,
}

impl TableScan {
    /// `value2` is the inclusive upper bound of `BETWEEN` and ignored otherwise.
    pub fn new(
        input: Arc<Operator>,
        column_id: ColumnId,
        scan_type: ScanType,
        value: impl Into<AllParameterVariant>,
        value2: Option<Value>,
    ) -> Result<Self, Error> {
        if scan_type == ScanType::Between && value2.is_none() {
            return Err(Error::MalformedPredicate(
                "BETWEEN requires an upper bound".to_string(),
            ));
        }
        Ok(Self {
            input,
            column_id,
            scan_type,
            value: value.into(),
            value2,
        })
    }

    pub fn input(&self) -> &Arc<Operator> {
        &self.input
    }

    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub fn value(&self) -> &AllParameterVariant {
        &self.value
    }

    pub(crate) fn recreate(&self, parameters: &[Value]) -> Result<Self, Error> {
        Ok(Self {
            input: self.input.recreate(parameters)?,
            column_id: self.column_id,
            scan_type: self.scan_type,
            value: self.value.bind(parameters)?,
            value2: self.value2.clone(),
        })
    }

    pub(crate) fn on_execute(&self) -> Result<Arc<Table>, Error> {
        let input = self.input.get_output()?;
        let value = match &self.value {
            AllParameterVariant::Value(value) => value,
            AllParameterVariant::Placeholder(placeholder) => {
                return Err(Error::MalformedPredicate(format!(
                    "placeholder {} is not bound",
                    placeholder.index()
                )))
            }
        };

        let data_type = input.column_type(self.column_id)?;
        crate::resolve_column_type!(data_type, ColumnT => {
            let predicate = Predicate::<ColumnT>::new(self.scan_type, value, self.value2.as_ref())?;
            self.scan(&input, &predicate)
        })
    }

    fn scan<T: ColumnType>(&self, input: &Arc<Table>, predicate: &Predicate<T>) -> Result<Arc<Table>, Error> {
        let mut output = Table::new(0);
        for definition in input.column_definitions() {
            output.add_column_definition(definition.name.clone(), definition.data_type)?;
        }

        for (chunk_id, chunk) in input.chunks().iter().enumerate() {
            let column = chunk.get_column(self.column_id)?;
            let offsets = predicate.matching_offsets(self.column_id, column)?;
            if offsets.is_empty() {
                continue;
            }
            let positions: PosList = offsets
                .into_iter()
                .map(|offset| RowId::new(chunk_id as ChunkId, offset))
                .collect();
            output.emplace_chunk(reference_chunk(input, &Arc::new(positions))?)?;
        }

        Ok(Arc::new(output))
    }
}

/// A typed comparison against one or two bounds.
struct Predicate<T> {
    scan_type: ScanType,
    value: T,
    value2: Option<T>,
}

/// Matching value ids: either a half-open range or everything but one id.
#[derive(Debug, Clone, Copy)]
enum ValueIdFilter {
    Range(ValueId, ValueId),
    NotEqual(ValueId),
}

impl<T: ColumnType> Predicate<T> {
    fn new(scan_type: ScanType, value: &Value, value2: Option<&Value>) -> Result<Self, Error> {
        let value = T::from_value(value).ok_or_else(|| T::type_mismatch(value.data_type()))?;
        let value2 = match (scan_type, value2) {
            (ScanType::Between, Some(value2)) => {
                Some(T::from_value(value2).ok_or_else(|| T::type_mismatch(value2.data_type()))?)
            }
            (ScanType::Between, None) => {
                return Err(Error::MalformedPredicate(
                    "BETWEEN requires an upper bound".to_string(),
                ))
            }
            _ => None,
        };
        Ok(Self {
            scan_type,
            value,
            value2,
        })
    }

    fn matches(&self, candidate: &T) -> bool {
        let ordering = candidate.total_cmp(&self.value);
        match self.scan_type {
            ScanType::Equals => ordering == Ordering::Equal,
            ScanType::NotEquals => ordering != Ordering::Equal,
            ScanType::LessThan => ordering == Ordering::Less,
            ScanType::LessThanEquals => ordering != Ordering::Greater,
            ScanType::GreaterThan => ordering == Ordering::Greater,
            ScanType::GreaterThanEquals => ordering != Ordering::Less,
            ScanType::Between => {
                ordering != Ordering::Less
                    && self
                        .value2
                        .as_ref()
                        .is_some_and(|upper| candidate.total_cmp(upper) != Ordering::Greater)
            }
        }
    }

    /// Translate the predicate into value ids of `column`'s dictionary.
    fn value_id_filter(&self, column: &DictionaryColumn<T>) -> ValueIdFilter {
        match self.scan_type {
            ScanType::Equals => match column.find_value_id(&self.value) {
                Some(value_id) => ValueIdFilter::Range(value_id, value_id + 1),
                None => ValueIdFilter::Range(0, 0),
            },
            ScanType::NotEquals => match column.find_value_id(&self.value) {
                Some(value_id) => ValueIdFilter::NotEqual(value_id),
                None => ValueIdFilter::Range(0, ValueId::MAX),
            },
            ScanType::LessThan => ValueIdFilter::Range(0, column.lower_bound(&self.value)),
            ScanType::LessThanEquals => ValueIdFilter::Range(0, column.upper_bound(&self.value)),
            ScanType::GreaterThan => {
                ValueIdFilter::Range(column.upper_bound(&self.value), ValueId::MAX)
            }
            ScanType::GreaterThanEquals => {
                ValueIdFilter::Range(column.lower_bound(&self.value), ValueId::MAX)
            }
            ScanType::Between => match &self.value2 {
                Some(upper) => {
                    ValueIdFilter::Range(column.lower_bound(&self.value), column.upper_bound(upper))
                }
                None => ValueIdFilter::Range(0, 0),
            },
        }
    }

    fn matching_offsets(&self, column_id: ColumnId, column: &Column) -> Result<Vec<ChunkOffset>, Error> {
        match column {
            Column::Value(typed) => {
                let values = T::value_column(typed).ok_or_else(|| T::type_mismatch(typed.data_type()))?;
                Ok(values
                    .values()
                    .iter()
                    .enumerate()
                    .filter(|(_, value)| self.matches(value))
                    .map(|(offset, _)| offset as ChunkOffset)
                    .collect())
            }
            Column::Dictionary(typed) => {
                let dictionary =
                    T::dictionary_column(typed).ok_or_else(|| T::type_mismatch(typed.data_type()))?;
                let filter = self.value_id_filter(dictionary);
                Ok(dictionary
                    .attribute_vector()
                    .iter()
                    .enumerate()
                    .filter(|(_, value_id)| match filter {
                        ValueIdFilter::Range(low, high) => (low..high).contains(value_id),
                        ValueIdFilter::NotEqual(excluded) => *value_id != excluded,
                    })
                    .map(|(offset, _)| offset as ChunkOffset)
                    .collect())
            }
            Column::Reference(reference) => {
                let mut offsets = Vec::new();
                for offset in 0..reference.len() as ChunkOffset {
                    let value = column
                        .typed_value_at::<T>(offset)?
                        .ok_or(Error::RowOutOfRange {
                            column_id,
                            row: offset as usize,
                        })?;
                    if self.matches(&value) {
                        offsets.push(offset);
                    }
                }
                Ok(offsets)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DictionaryCompression;
    use crate::types::{DataType, ValuePlaceholder};

    fn int_table(compressed: bool) -> Arc<Operator> {
        let mut table = Table::with_columns(4, [("a", DataType::Int), ("b", DataType::String)]);
        for i in 0..10 {
            table
                .append(vec![Value::Int(i * 2), Value::from(format!("s{}", i % 3))])
                .unwrap();
        }
        if compressed {
            DictionaryCompression::compress_table(&mut table).unwrap();
        }
        let wrapper = Operator::table_wrapper(Arc::new(table));
        wrapper.execute().unwrap();
        wrapper
    }

    fn scan(input: Arc<Operator>, scan_type: ScanType, value: Value, value2: Option<Value>) -> Vec<i32> {
        let op = Operator::new(TableScan::new(input, 0, scan_type, value, value2).unwrap().into());
        let output = op.execute().unwrap();
        (0..output.row_count())
            .map(|row| output.get_value::<i32>(0, row).unwrap())
            .collect()
    }

    #[test]
    fn test_all_scan_types_plain_and_compressed() {
        for compressed in [false, true] {
            let input = || int_table(compressed);
            assert_eq!(scan(input(), ScanType::Equals, Value::Int(4), None), vec![4]);
            assert_eq!(scan(input(), ScanType::Equals, Value::Int(5), None), Vec::<i32>::new());
            assert_eq!(scan(input(), ScanType::NotEquals, Value::Int(4), None).len(), 9);
            assert_eq!(scan(input(), ScanType::NotEquals, Value::Int(5), None).len(), 10);
            assert_eq!(scan(input(), ScanType::LessThan, Value::Int(4), None), vec![0, 2]);
            assert_eq!(scan(input(), ScanType::LessThanEquals, Value::Int(4), None), vec![0, 2, 4]);
            assert_eq!(scan(input(), ScanType::GreaterThan, Value::Int(14), None), vec![16, 18]);
            assert_eq!(scan(input(), ScanType::GreaterThanEquals, Value::Int(15), None), vec![16, 18]);
            assert_eq!(
                scan(input(), ScanType::Between, Value::Int(3), Some(Value::Int(8))),
                vec![4, 6, 8]
            );
        }
    }

    #[test]
    fn test_output_references_input() {
        let input = int_table(false);
        let op = Operator::new(
            TableScan::new(Arc::clone(&input), 0, ScanType::GreaterThanEquals, Value::Int(6), None)
                .unwrap()
                .into(),
        );
        let output = op.execute().unwrap();

        assert!(output.is_reference_table());
        assert_eq!(output.column_names(), vec!["a", "b"]);
        // Chunk 0 holds 0,2,4,6; chunk 1 holds 8..14; chunk 2 holds 16,18.
        assert_eq!(output.chunk_count(), 3);
        let reference = output.get_chunk(0).unwrap().get_column(1).unwrap();
        let reference = reference.as_reference().unwrap();
        assert!(Arc::ptr_eq(reference.referenced_table(), &input.get_output().unwrap()));
    }

    #[test]
    fn test_scan_on_scan_output() {
        let input = int_table(true);
        let first = Operator::new(
            TableScan::new(input, 0, ScanType::GreaterThan, Value::Int(4), None)
                .unwrap()
                .into(),
        );
        first.execute().unwrap();
        let second = Operator::new(
            TableScan::new(first, 1, ScanType::Equals, Value::from("s0"), None)
                .unwrap()
                .into(),
        );
        let output = second.execute().unwrap();

        // Rows with a > 4 and i % 3 == 0: i = 3, 6, 9.
        let values: Vec<i32> = (0..output.row_count())
            .map(|row| output.get_value::<i32>(0, row).unwrap())
            .collect();
        assert_eq!(values, vec![6, 12, 18]);
        let reference = output.get_chunk(0).unwrap().get_column(0).unwrap();
        assert!(!reference.as_reference().unwrap().referenced_table().is_reference_table());
    }

    #[test]
    fn test_empty_result_keeps_schema() {
        let op = Operator::new(
            TableScan::new(int_table(false), 0, ScanType::LessThan, Value::Int(-5), None)
                .unwrap()
                .into(),
        );
        let output = op.execute().unwrap();
        assert_eq!(output.row_count(), 0);
        assert_eq!(output.column_count(), 2);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            TableScan::new(int_table(false), 0, ScanType::Between, Value::Int(1), None),
            Err(Error::MalformedPredicate(_))
        ));

        let wrong_type = Operator::new(
            TableScan::new(int_table(false), 0, ScanType::Equals, Value::from("x"), None)
                .unwrap()
                .into(),
        );
        assert!(matches!(wrong_type.execute(), Err(Error::TypeMismatch { .. })));

        let unbound = Operator::new(
            TableScan::new(int_table(false), 0, ScanType::Equals, ValuePlaceholder::new(0), None)
                .unwrap()
                .into(),
        );
        assert!(matches!(unbound.execute(), Err(Error::MalformedPredicate(_))));
    }

    #[test]
    fn test_recreate_binds_placeholder() {
        let prepared = Operator::new(
            TableScan::new(int_table(false), 0, ScanType::LessThan, ValuePlaceholder::new(0), None)
                .unwrap()
                .into(),
        );
        let bound = prepared.recreate(&[Value::Int(5)]).unwrap();
        let output = bound.execute_tree().unwrap();
        assert_eq!(output.row_count(), 3);
        assert!(!prepared.is_executed());
    }
}
