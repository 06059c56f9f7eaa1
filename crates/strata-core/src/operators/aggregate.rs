//! Grouped aggregation.
//!
//! Each input chunk is aggregated by its own task into per-group partial
//! states. The partials are merged in chunk order, so groups appear in the
//! output in order of their first occurrence in the input.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Operator;
use crate::error::Error;
use crate::scheduler::CurrentScheduler;
use crate::storage::{Column, Table};
use crate::types::{ChunkId, ColumnId, DataType, Value};

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Count => "COUNT",
        }
    }

    /// Type of the aggregate's result over an input column of `input` type.
    pub fn result_type(&self, input: DataType) -> DataType {
        match self {
            AggregateFunction::Min | AggregateFunction::Max => input,
            AggregateFunction::Sum => match input {
                DataType::Int | DataType::Long => DataType::Long,
                _ => DataType::Double,
            },
            AggregateFunction::Avg => DataType::Double,
            AggregateFunction::Count => DataType::Long,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One aggregate to compute: a function over a column, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDefinition {
    pub column_id: ColumnId,
    pub function: AggregateFunction,
    pub alias: Option<String>,
}

impl AggregateDefinition {
    pub fn new(column_id: ColumnId, function: AggregateFunction) -> Self {
        Self {
            column_id,
            function,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Groups rows by a set of columns and computes aggregates per group.
///
/// Without group-by columns the output has exactly one row, also for empty
/// inputs: `COUNT` and `SUM` are zero there, and `MIN`, `MAX` and `AVG` fall
/// back to the zero value of their result type.
#[derive(Debug, Clone)]
pub struct Aggregate {
    input: Arc<Operator>,
    aggregates: Arc<Vec<AggregateDefinition>>,
    groupby_column_ids: Arc<Vec<ColumnId>>,
}

impl Aggregate {
    pub fn new(
        input: Arc<Operator>,
        aggregates: Vec<AggregateDefinition>,
        groupby_column_ids: Vec<ColumnId>,
    ) -> Result<Self, Error> {
        if aggregates.is_empty() && groupby_column_ids.is_empty() {
            return Err(Error::InvalidConfiguration(
                "aggregate needs at least one aggregate or group-by column".to_string(),
            ));
        }
        Ok(Self {
            input,
            aggregates: Arc::new(aggregates),
            groupby_column_ids: Arc::new(groupby_column_ids),
        })
    }

    pub fn input(&self) -> &Arc<Operator> {
        &self.input
    }

    pub fn aggregates(&self) -> &[AggregateDefinition] {
        &self.aggregates
    }

    pub fn groupby_column_ids(&self) -> &[ColumnId] {
        &self.groupby_column_ids
    }

    pub(crate) fn recreate(&self, parameters: &[Value]) -> Result<Self, Error> {
        Ok(Self {
            input: self.input.recreate(parameters)?,
            aggregates: Arc::clone(&self.aggregates),
            groupby_column_ids: Arc::clone(&self.groupby_column_ids),
        })
    }

    pub(crate) fn on_execute(&self) -> Result<Arc<Table>, Error> {
        let input = self.input.get_output()?;

        let mut output = Table::new(0);
        for &column_id in self.groupby_column_ids.iter() {
            output.add_column(input.column_name(column_id)?, input.column_type(column_id)?)?;
        }
        let mut input_types = Vec::with_capacity(self.aggregates.len());
        for aggregate in self.aggregates.iter() {
            let input_type = input.column_type(aggregate.column_id)?;
            if matches!(aggregate.function, AggregateFunction::Sum | AggregateFunction::Avg)
                && !input_type.is_numeric()
            {
                return Err(Error::InvalidType(format!(
                    "{} is not defined for {} column {}",
                    aggregate.function,
                    input_type,
                    input.column_name(aggregate.column_id)?
                )));
            }
            let name = match &aggregate.alias {
                Some(alias) => alias.clone(),
                None => format!(
                    "{}({})",
                    aggregate.function,
                    input.column_name(aggregate.column_id)?
                ),
            };
            output.add_column(name, aggregate.function.result_type(input_type))?;
            input_types.push(input_type);
        }
        let input_types = Arc::new(input_types);

        let partials = CurrentScheduler::run_all((0..input.chunk_count()).map(|chunk_id| {
            let input = Arc::clone(&input);
            let aggregates = Arc::clone(&self.aggregates);
            let groupby = Arc::clone(&self.groupby_column_ids);
            let input_types = Arc::clone(&input_types);
            move || aggregate_chunk(&input, chunk_id, &aggregates, &groupby, &input_types)
        }));

        let mut groups = Groups::default();
        for partial in partials {
            groups.merge(partial?);
        }
        if groups.rows.is_empty() && self.groupby_column_ids.is_empty() {
            let states = self
                .aggregates
                .iter()
                .zip(input_types.iter())
                .map(|(aggregate, input_type)| AggregateState::new(aggregate.function, *input_type))
                .collect();
            groups.rows.push((Vec::new(), states));
        }

        for (keys, states) in groups.rows {
            let mut row = keys;
            row.extend(
                states
                    .into_iter()
                    .zip(self.aggregates.iter())
                    .zip(input_types.iter())
                    .map(|((state, aggregate), input_type)| {
                        state.finish(aggregate.function.result_type(*input_type))
                    }),
            );
            output.append(row)?;
        }

        Ok(Arc::new(output))
    }
}

/// Hashable identity of a group-by value. Floats group by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    String(String),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(v) => KeyPart::Int(*v),
            Value::Long(v) => KeyPart::Long(*v),
            Value::Float(v) => KeyPart::Float(v.to_bits()),
            Value::Double(v) => KeyPart::Double(v.to_bits()),
            Value::String(v) => KeyPart::String(v.clone()),
        }
    }
}

/// Running state of one aggregate within one group.
#[derive(Debug, Clone)]
enum AggregateState {
    Min(Option<Value>),
    Max(Option<Value>),
    IntegralSum(i64),
    FloatingSum(f64),
    Avg { sum: f64, count: u64 },
    Count(u64),
}

impl AggregateState {
    fn new(function: AggregateFunction, input_type: DataType) -> Self {
        match function {
            AggregateFunction::Min => AggregateState::Min(None),
            AggregateFunction::Max => AggregateState::Max(None),
            AggregateFunction::Sum => match input_type {
                DataType::Int | DataType::Long => AggregateState::IntegralSum(0),
                _ => AggregateState::FloatingSum(0.0),
            },
            AggregateFunction::Avg => AggregateState::Avg { sum: 0.0, count: 0 },
            AggregateFunction::Count => AggregateState::Count(0),
        }
    }

    fn update(&mut self, value: Value) {
        match self {
            AggregateState::Min(current) => keep_if(current, value, std::cmp::Ordering::Less),
            AggregateState::Max(current) => keep_if(current, value, std::cmp::Ordering::Greater),
            AggregateState::IntegralSum(sum) => {
                let addend = match value {
                    Value::Int(v) => v as i64,
                    Value::Long(v) => v,
                    _ => 0,
                };
                *sum = sum.saturating_add(addend);
            }
            AggregateState::FloatingSum(sum) => *sum += value.as_f64().unwrap_or_default(),
            AggregateState::Avg { sum, count } => {
                *sum += value.as_f64().unwrap_or_default();
                *count += 1;
            }
            AggregateState::Count(count) => *count += 1,
        }
    }

    fn merge(&mut self, other: AggregateState) {
        match (self, other) {
            (AggregateState::Min(current), AggregateState::Min(Some(value))) => {
                keep_if(current, value, std::cmp::Ordering::Less)
            }
            (AggregateState::Max(current), AggregateState::Max(Some(value))) => {
                keep_if(current, value, std::cmp::Ordering::Greater)
            }
            (AggregateState::IntegralSum(sum), AggregateState::IntegralSum(other)) => {
                *sum = sum.saturating_add(other)
            }
            (AggregateState::FloatingSum(sum), AggregateState::FloatingSum(other)) => *sum += other,
            (
                AggregateState::Avg { sum, count },
                AggregateState::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count += other_count;
            }
            (AggregateState::Count(count), AggregateState::Count(other)) => *count += other,
            _ => {}
        }
    }

    fn finish(self, result_type: DataType) -> Value {
        match self {
            AggregateState::Min(value) | AggregateState::Max(value) => {
                value.unwrap_or_else(|| Value::zero(result_type))
            }
            AggregateState::IntegralSum(sum) => Value::Long(sum),
            AggregateState::FloatingSum(sum) => Value::Double(sum),
            AggregateState::Avg { sum, count } => {
                Value::Double(if count == 0 { 0.0 } else { sum / count as f64 })
            }
            AggregateState::Count(count) => Value::Long(count as i64),
        }
    }
}

/// Replace `current` with `candidate` if it compares as `wanted` against it.
fn keep_if(current: &mut Option<Value>, candidate: Value, wanted: std::cmp::Ordering) {
    let replace = match current {
        None => true,
        Some(existing) => candidate.compare(existing) == Some(wanted),
    };
    if replace {
        *current = Some(candidate);
    }
}

/// Groups in first-seen order.
#[derive(Debug, Default)]
struct Groups {
    index: HashMap<Vec<KeyPart>, usize>,
    rows: Vec<(Vec<Value>, Vec<AggregateState>)>,
}

impl Groups {
    fn states_for(&mut self, keys: Vec<Value>, init: impl FnOnce() -> Vec<AggregateState>) -> &mut Vec<AggregateState> {
        let key: Vec<KeyPart> = keys.iter().map(KeyPart::from).collect();
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.rows.push((keys, init()));
                self.index.insert(key, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        &mut self.rows[position].1
    }

    fn merge(&mut self, other: Groups) {
        for (keys, states) in other.rows {
            let mut incoming = Some(states);
            let current = self.states_for(keys, || incoming.take().unwrap_or_default());
            if let Some(states) = incoming {
                for (state, other) in current.iter_mut().zip(states) {
                    state.merge(other);
                }
            }
        }
    }
}

fn aggregate_chunk(
    input: &Table,
    chunk_id: ChunkId,
    aggregates: &[AggregateDefinition],
    groupby: &[ColumnId],
    input_types: &[DataType],
) -> Result<Groups, Error> {
    let chunk = input.get_chunk(chunk_id)?;
    let group_columns = groupby
        .iter()
        .map(|&column_id| chunk.get_column(column_id).map(|column| (column_id, column.as_ref())))
        .collect::<Result<Vec<(ColumnId, &Column)>, Error>>()?;
    let aggregate_columns = aggregates
        .iter()
        .map(|aggregate| chunk.get_column(aggregate.column_id).map(|column| (aggregate.column_id, column.as_ref())))
        .collect::<Result<Vec<(ColumnId, &Column)>, Error>>()?;

    let value_at = |(column_id, column): &(ColumnId, &Column), offset: usize| {
        column
            .value_at(offset as u32)
            .ok_or(Error::RowOutOfRange {
                column_id: *column_id,
                row: offset,
            })
    };

    let mut groups = Groups::default();
    for offset in 0..chunk.size() {
        let keys = group_columns
            .iter()
            .map(|column| value_at(column, offset))
            .collect::<Result<Vec<Value>, Error>>()?;
        let states = groups.states_for(keys, || {
            aggregates
                .iter()
                .zip(input_types)
                .map(|(aggregate, input_type)| AggregateState::new(aggregate.function, *input_type))
                .collect()
        });
        for (state, column) in states.iter_mut().zip(&aggregate_columns) {
            state.update(value_at(column, offset)?);
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DictionaryCompression;

    fn input(compressed: bool) -> Arc<Operator> {
        let mut table = Table::with_columns(
            2,
            [("a", DataType::Int), ("b", DataType::Int), ("c", DataType::String)],
        );
        for (a, b, c) in [
            (12345, 456, "x"),
            (123, 458, "y"),
            (12345, 457, "x"),
            (1234, 12, "z"),
            (123, 100, "y"),
        ] {
            table.append(vec![Value::Int(a), Value::Int(b), Value::from(c)]).unwrap();
        }
        if compressed {
            DictionaryCompression::compress_table(&mut table).unwrap();
        }
        let wrapper = Operator::table_wrapper(Arc::new(table));
        wrapper.execute().unwrap();
        wrapper
    }

    fn aggregate(
        input: Arc<Operator>,
        aggregates: Vec<AggregateDefinition>,
        groupby: Vec<ColumnId>,
    ) -> Arc<Table> {
        let op = Operator::new(Aggregate::new(input, aggregates, groupby).unwrap().into());
        op.execute().unwrap()
    }

    #[test]
    fn test_max_grouped_by_first_occurrence() {
        for compressed in [false, true] {
            let output = aggregate(
                input(compressed),
                vec![AggregateDefinition::new(1, AggregateFunction::Max)],
                vec![0],
            );
            assert_eq!(output.column_names(), vec!["a", "MAX(b)"]);
            assert_eq!(
                output.rows().unwrap(),
                vec![
                    vec![Value::Int(12345), Value::Int(457)],
                    vec![Value::Int(123), Value::Int(458)],
                    vec![Value::Int(1234), Value::Int(12)],
                ]
            );
        }
    }

    #[test]
    fn test_result_types() {
        let output = aggregate(
            input(false),
            vec![
                AggregateDefinition::new(1, AggregateFunction::Sum),
                AggregateDefinition::new(1, AggregateFunction::Avg),
                AggregateDefinition::new(2, AggregateFunction::Count).with_alias("n"),
                AggregateDefinition::new(2, AggregateFunction::Min),
            ],
            vec![],
        );
        assert_eq!(output.column_names(), vec!["SUM(b)", "AVG(b)", "n", "MIN(c)"]);
        assert_eq!(
            output.rows().unwrap(),
            vec![vec![
                Value::Long(1483),
                Value::Double(1483.0 / 5.0),
                Value::Long(5),
                Value::from("x"),
            ]]
        );
    }

    #[test]
    fn test_multi_column_groupby() {
        let output = aggregate(
            input(true),
            vec![AggregateDefinition::new(1, AggregateFunction::Sum)],
            vec![0, 2],
        );
        assert_eq!(output.row_count(), 3);
        assert_eq!(
            output.rows().unwrap()[1],
            vec![Value::Int(123), Value::from("y"), Value::Long(558)]
        );
    }

    #[test]
    fn test_groupby_only_is_distinct() {
        let output = aggregate(input(false), vec![], vec![2]);
        assert_eq!(output.column_names(), vec!["c"]);
        assert_eq!(output.row_count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let table = Table::with_columns(0, [("a", DataType::Int), ("d", DataType::Double)]);
        let wrapper = Operator::table_wrapper(Arc::new(table));
        wrapper.execute().unwrap();

        let grouped = aggregate(
            Arc::clone(&wrapper),
            vec![AggregateDefinition::new(1, AggregateFunction::Sum)],
            vec![0],
        );
        assert_eq!(grouped.row_count(), 0);

        let total = aggregate(
            wrapper,
            vec![
                AggregateDefinition::new(0, AggregateFunction::Count),
                AggregateDefinition::new(1, AggregateFunction::Sum),
                AggregateDefinition::new(0, AggregateFunction::Max),
            ],
            vec![],
        );
        assert_eq!(
            total.rows().unwrap(),
            vec![vec![Value::Long(0), Value::Double(0.0), Value::Int(0)]]
        );
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(matches!(
            Aggregate::new(input(false), vec![], vec![]),
            Err(Error::InvalidConfiguration(_))
        ));

        let sum_of_strings = Operator::new(
            Aggregate::new(
                input(false),
                vec![AggregateDefinition::new(2, AggregateFunction::Sum)],
                vec![],
            )
            .unwrap()
            .into(),
        );
        assert!(matches!(sum_of_strings.execute(), Err(Error::InvalidType(_))));

        let missing = Operator::new(
            Aggregate::new(input(false), vec![], vec![9]).unwrap().into(),
        );
        assert!(matches!(missing.execute(), Err(Error::ColumnNotFound(_))));
    }
}
