//! Cardinality estimation for the optimizer.

mod column_statistics;
mod table_statistics;

pub use column_statistics::{
    AbstractColumnStatistics, ColumnSelectivity, ColumnStatistics, TableHandle,
    TwoColumnSelectivity,
};
pub use table_statistics::TableStatistics;
