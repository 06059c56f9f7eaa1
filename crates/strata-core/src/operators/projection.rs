//! Column selection and renaming.

use std::sync::Arc;

use super::Operator;
use crate::error::Error;
use crate::storage::{Chunk, Table};
use crate::types::{ColumnId, Value};

/// One output column of a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionColumn {
    pub column_id: ColumnId,
    pub alias: Option<String>,
}

impl ProjectionColumn {
    pub fn new(column_id: ColumnId) -> Self {
        Self {
            column_id,
            alias: None,
        }
    }

    pub fn aliased(column_id: ColumnId, alias: impl Into<String>) -> Self {
        Self {
            column_id,
            alias: Some(alias.into()),
        }
    }
}

impl From<ColumnId> for ProjectionColumn {
    fn from(column_id: ColumnId) -> Self {
        Self::new(column_id)
    }
}

/// Selects, reorders and renames columns without copying data.
///
/// Output chunks share the input's column objects, so a projection over a
/// reference table is itself a reference table over the same data.
#[derive(Debug, Clone)]
pub struct Projection {
    input: Arc<Operator>,
    columns: Vec<ProjectionColumn>,
}

impl Projection {
    pub fn new<C>(input: Arc<Operator>, columns: impl IntoIterator<Item = C>) -> Result<Self, Error>
    where
        C: Into<ProjectionColumn>,
    {
        let columns: Vec<ProjectionColumn> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::InvalidConfiguration(
                "projection needs at least one column".to_string(),
            ));
        }
        Ok(Self { input, columns })
    }

    pub fn input(&self) -> &Arc<Operator> {
        &self.input
    }

    pub fn columns(&self) -> &[ProjectionColumn] {
        &self.columns
    }

    pub(crate) fn recreate(&self, parameters: &[Value]) -> Result<Self, Error> {
        Ok(Self {
            input: self.input.recreate(parameters)?,
            columns: self.columns.clone(),
        })
    }

    pub(crate) fn on_execute(&self) -> Result<Arc<Table>, Error> {
        let input = self.input.get_output()?;

        let mut output = Table::new(input.max_chunk_size());
        for column in &self.columns {
            let name = match &column.alias {
                Some(alias) => alias.clone(),
                None => input.column_name(column.column_id)?.to_string(),
            };
            output.add_column_definition(name, input.column_type(column.column_id)?)?;
        }

        for chunk in input.chunks() {
            let columns = self
                .columns
                .iter()
                .map(|column| chunk.get_column(column.column_id).cloned())
                .collect::<Result<Vec<_>, Error>>()?;
            output.emplace_chunk(Chunk::from_columns(columns))?;
        }

        Ok(Arc::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn input() -> Arc<Operator> {
        let mut table = Table::with_columns(2, [("a", DataType::Int), ("b", DataType::String)]);
        for i in 0..3 {
            table.append(vec![Value::Int(i), Value::from(format!("v{i}"))]).unwrap();
        }
        let wrapper = Operator::table_wrapper(Arc::new(table));
        wrapper.execute().unwrap();
        wrapper
    }

    #[test]
    fn test_reorders_and_renames() {
        let projection = Operator::new(
            Projection::new(input(), [ProjectionColumn::new(1), ProjectionColumn::aliased(0, "id")])
                .unwrap()
                .into(),
        );
        let output = projection.execute().unwrap();

        assert_eq!(output.column_names(), vec!["b", "id"]);
        assert_eq!(output.chunk_count(), 2);
        assert_eq!(
            output.rows().unwrap()[2],
            vec![Value::from("v2"), Value::Int(2)]
        );
    }

    #[test]
    fn test_shares_column_objects() {
        let input = input();
        let projection = Operator::new(Projection::new(Arc::clone(&input), [0usize]).unwrap().into());
        let output = projection.execute().unwrap();
        let source = input.get_output().unwrap();

        assert!(Arc::ptr_eq(
            output.get_chunk(0).unwrap().get_column(0).unwrap(),
            source.get_chunk(0).unwrap().get_column(0).unwrap()
        ));
    }

    #[test]
    fn test_invalid_columns() {
        assert!(Projection::new(input(), Vec::<ColumnId>::new()).is_err());

        let projection = Operator::new(Projection::new(input(), [7usize]).unwrap().into());
        assert!(matches!(projection.execute(), Err(Error::ColumnNotFound(_))));
    }
}
