//! Physical query operators.
//!
//! Operators form a tree: each [`Operator`] reads the outputs of its inputs and
//! publishes exactly one immutable output table. An operator executes once;
//! its output is then shared by every parent that reads it.

mod aggregate;
mod get_table;
mod join_sort_merge;
mod projection;
mod table_scan;
mod table_wrapper;

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, instrument};

pub use aggregate::{Aggregate, AggregateDefinition, AggregateFunction};
pub use get_table::GetTable;
pub use join_sort_merge::{
    ColumnMaterializer, JoinSortMerge, MaterializedColumn, MaterializedColumnList,
    MaterializedValue, RadixClusterSort,
};
pub use projection::{Projection, ProjectionColumn};
pub use table_scan::TableScan;
pub use table_wrapper::TableWrapper;

use crate::error::Error;
use crate::storage::Table;
use crate::types::Value;

/// The operator algorithms.
#[derive(Debug)]
pub enum OperatorKind {
    TableWrapper(TableWrapper),
    GetTable(GetTable),
    TableScan(TableScan),
    Projection(Projection),
    Aggregate(Aggregate),
    JoinSortMerge(JoinSortMerge),
}

/// A node of an operator tree plus its cached output.
#[derive(Debug)]
pub struct Operator {
    kind: OperatorKind,
    output: OnceLock<Arc<Table>>,
}

impl Operator {
    pub fn new(kind: OperatorKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            output: OnceLock::new(),
        })
    }

    /// Leaf wrapping an existing table.
    pub fn table_wrapper(table: Arc<Table>) -> Arc<Self> {
        Self::new(OperatorKind::TableWrapper(TableWrapper::new(table)))
    }

    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            OperatorKind::TableWrapper(_) => "TableWrapper",
            OperatorKind::GetTable(_) => "GetTable",
            OperatorKind::TableScan(_) => "TableScan",
            OperatorKind::Projection(_) => "Projection",
            OperatorKind::Aggregate(_) => "Aggregate",
            OperatorKind::JoinSortMerge(_) => "JoinSortMerge",
        }
    }

    /// Number of input operators.
    pub fn num_in_tables(&self) -> usize {
        self.inputs().len()
    }

    /// Number of output tables; always one.
    pub fn num_out_tables(&self) -> usize {
        1
    }

    pub fn inputs(&self) -> Vec<&Arc<Operator>> {
        match &self.kind {
            OperatorKind::TableWrapper(_) | OperatorKind::GetTable(_) => Vec::new(),
            OperatorKind::TableScan(op) => vec![op.input()],
            OperatorKind::Projection(op) => vec![op.input()],
            OperatorKind::Aggregate(op) => vec![op.input()],
            OperatorKind::JoinSortMerge(op) => vec![op.left(), op.right()],
        }
    }

    /// Run the operator. Inputs must have executed already.
    ///
    /// Executing an operator a second time returns the cached output.
    #[instrument(skip(self), fields(operator = self.name()))]
    pub fn execute(&self) -> Result<Arc<Table>, Error> {
        if let Some(output) = self.output.get() {
            return Ok(Arc::clone(output));
        }

        let started = Instant::now();
        let output = match &self.kind {
            OperatorKind::TableWrapper(op) => op.on_execute(),
            OperatorKind::GetTable(op) => op.on_execute(),
            OperatorKind::TableScan(op) => op.on_execute(),
            OperatorKind::Projection(op) => op.on_execute(),
            OperatorKind::Aggregate(op) => op.on_execute(),
            OperatorKind::JoinSortMerge(op) => op.on_execute(),
        }?;

        debug!(
            rows = output.row_count(),
            chunks = output.chunk_count(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Operator executed"
        );
        Ok(Arc::clone(self.output.get_or_init(|| output)))
    }

    /// Execute all inputs depth-first, then this operator.
    pub fn execute_tree(&self) -> Result<Arc<Table>, Error> {
        for input in self.inputs() {
            input.execute_tree()?;
        }
        self.execute()
    }

    /// The output table of an executed operator.
    pub fn get_output(&self) -> Result<Arc<Table>, Error> {
        self.output
            .get()
            .cloned()
            .ok_or(Error::NotExecuted(self.name()))
    }

    pub fn is_executed(&self) -> bool {
        self.output.get().is_some()
    }

    /// Fresh, unexecuted copy of the tree with placeholders bound to `parameters`.
    pub fn recreate(&self, parameters: &[Value]) -> Result<Arc<Operator>, Error> {
        let kind = match &self.kind {
            OperatorKind::TableWrapper(op) => OperatorKind::TableWrapper(op.clone()),
            OperatorKind::GetTable(op) => OperatorKind::GetTable(op.clone()),
            OperatorKind::TableScan(op) => OperatorKind::TableScan(op.recreate(parameters)?),
            OperatorKind::Projection(op) => OperatorKind::Projection(op.recreate(parameters)?),
            OperatorKind::Aggregate(op) => OperatorKind::Aggregate(op.recreate(parameters)?),
            OperatorKind::JoinSortMerge(op) => OperatorKind::JoinSortMerge(op.recreate(parameters)?),
        };
        Ok(Self::new(kind))
    }
}

impl From<TableWrapper> for OperatorKind {
    fn from(op: TableWrapper) -> Self {
        OperatorKind::TableWrapper(op)
    }
}

impl From<GetTable> for OperatorKind {
    fn from(op: GetTable) -> Self {
        OperatorKind::GetTable(op)
    }
}

impl From<TableScan> for OperatorKind {
    fn from(op: TableScan) -> Self {
        OperatorKind::TableScan(op)
    }
}

impl From<Projection> for OperatorKind {
    fn from(op: Projection) -> Self {
        OperatorKind::Projection(op)
    }
}

impl From<Aggregate> for OperatorKind {
    fn from(op: Aggregate) -> Self {
        OperatorKind::Aggregate(op)
    }
}

impl From<JoinSortMerge> for OperatorKind {
    fn from(op: JoinSortMerge) -> Self {
        OperatorKind::JoinSortMerge(op)
    }
}
