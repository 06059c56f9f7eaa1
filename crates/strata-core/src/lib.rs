//! Strata Core - columnar storage, task scheduling and query operators.
//!
//! This crate provides the in-memory column store for Strata: tables made of
//! chunks of value, dictionary and reference columns, a worker-pool task
//! scheduler, the physical operators that run on top of them, and the column
//! statistics the optimizer uses for cardinality estimates.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod error;
pub mod operators;
pub mod optimizer;
pub mod scheduler;
pub mod storage;
pub mod types;
pub mod utils;

pub use config::{JoinConfig, SchedulerConfig, DEFAULT_MAX_CHUNK_SIZE};
pub use error::Error;
pub use operators::{
    Aggregate, AggregateDefinition, AggregateFunction, GetTable, JoinSortMerge, Operator,
    OperatorKind, Projection, ProjectionColumn, TableScan, TableWrapper,
};
pub use optimizer::{AbstractColumnStatistics, ColumnStatistics, TableStatistics};
pub use scheduler::{CurrentScheduler, Task, TaskScheduler};
pub use storage::{Catalog, Chunk, Column, DictionaryCompression, Table};
pub use types::{
    AllParameterVariant, ChunkId, ChunkOffset, ColumnId, ColumnType, DataType, PosList, RowId,
    ScanType, Value, ValueId, ValuePlaceholder,
};
pub use utils::{LoopState, PausableLoopThread};
