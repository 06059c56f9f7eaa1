//! Strata Benchmark Suite
//!
//! Criterion benchmarks for the Strata column store.
//!
//! # Benchmark Categories
//!
//! - **Scan**: Table scans over value and dictionary columns
//! - **Aggregate**: Grouped aggregation with and without worker threads
//! - **Join**: Sort-merge join for equi and range predicates across cluster counts

pub mod fixtures;
pub mod harness;

pub use fixtures::{generate_customers, generate_orders, Scale};
pub use harness::BenchContext;
