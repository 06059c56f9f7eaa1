//! Sort-merge join.
//!
//! Both inputs are clustered and sorted by [`RadixClusterSort`]. Equi-joins
//! then merge each pair of same-index clusters in its own task. Non-equi
//! joins concatenate the range clusters, which yields globally sorted inputs,
//! and pair every left value with the matching suffix or prefix of the right.

mod column_materializer;
mod radix_cluster_sort;

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

pub use column_materializer::{
    ColumnMaterializer, MaterializedColumn, MaterializedColumnList, MaterializedValue,
};
pub use radix_cluster_sort::RadixClusterSort;

use super::Operator;
use crate::config::JoinConfig;
use crate::error::Error;
use crate::scheduler::CurrentScheduler;
use crate::storage::{reference_columns, Chunk, Table};
use crate::types::{ColumnId, ColumnType, PosList, ScanType, Value};

/// Inner join of two inputs on one column each.
///
/// The output is a reference table: the left input's columns followed by the
/// right input's columns, in one chunk.
#[derive(Debug, Clone)]
pub struct JoinSortMerge {
    left: Arc<Operator>,
    right: Arc<Operator>,
    column_ids: (ColumnId, ColumnId),
    scan_type: ScanType,
    config: JoinConfig,
}

impl JoinSortMerge {
    pub fn new(
        left: Arc<Operator>,
        right: Arc<Operator>,
        column_ids: (ColumnId, ColumnId),
        scan_type: ScanType,
    ) -> Result<Self, Error> {
        if matches!(scan_type, ScanType::NotEquals | ScanType::Between) {
            return Err(Error::InvalidConfiguration(format!(
                "sort-merge join does not support {scan_type}"
            )));
        }
        Ok(Self {
            left,
            right,
            column_ids,
            scan_type,
            config: JoinConfig::default(),
        })
    }

    pub fn with_config(mut self, config: JoinConfig) -> Result<Self, Error> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Fix the number of clusters; must be a power of two.
    pub fn with_cluster_count(self, cluster_count: usize) -> Result<Self, Error> {
        let config = self.config.clone().with_cluster_count(cluster_count);
        self.with_config(config)
    }

    pub fn left(&self) -> &Arc<Operator> {
        &self.left
    }

    pub fn right(&self) -> &Arc<Operator> {
        &self.right
    }

    pub fn column_ids(&self) -> (ColumnId, ColumnId) {
        self.column_ids
    }

    pub fn scan_type(&self) -> ScanType {
        self.scan_type
    }

    pub(crate) fn recreate(&self, parameters: &[Value]) -> Result<Self, Error> {
        Ok(Self {
            left: self.left.recreate(parameters)?,
            right: self.right.recreate(parameters)?,
            column_ids: self.column_ids,
            scan_type: self.scan_type,
            config: self.config.clone(),
        })
    }

    pub(crate) fn on_execute(&self) -> Result<Arc<Table>, Error> {
        let left = self.left.get_output()?;
        let right = self.right.get_output()?;

        let left_type = left.column_type(self.column_ids.0)?;
        let right_type = right.column_type(self.column_ids.1)?;
        if left_type != right_type {
            return Err(Error::TypeMismatch {
                expected: left_type,
                actual: right_type,
            });
        }

        let cluster_count = self
            .config
            .cluster_count
            .unwrap_or_else(|| default_cluster_count(&left, &right));
        let (left_positions, right_positions) = crate::resolve_column_type!(left_type, ColumnT => {
            self.join::<ColumnT>(&left, &right, cluster_count)?
        });
        debug!(
            cluster_count,
            matches = left_positions.len(),
            "Sort-merge join finished"
        );

        let mut output = Table::new(0);
        for definition in left.column_definitions().iter().chain(right.column_definitions()) {
            output.add_column_definition(definition.name.clone(), definition.data_type)?;
        }
        if !left_positions.is_empty() {
            let mut columns = reference_columns(&left, &Arc::new(left_positions))?;
            columns.extend(reference_columns(&right, &Arc::new(right_positions))?);
            output.emplace_chunk(Chunk::from_columns(columns))?;
        }
        Ok(Arc::new(output))
    }

    fn join<T: ColumnType>(
        &self,
        left: &Arc<Table>,
        right: &Arc<Table>,
        cluster_count: usize,
    ) -> Result<(PosList, PosList), Error> {
        let equi_case = self.scan_type == ScanType::Equals;
        let (left_clusters, right_clusters) = RadixClusterSort::<T>::new(
            Arc::clone(left),
            Arc::clone(right),
            self.column_ids,
            equi_case,
            cluster_count,
        )?
        .execute()?;

        if equi_case {
            let merged = CurrentScheduler::run_all(
                left_clusters
                    .into_iter()
                    .zip(right_clusters)
                    .map(|(left, right)| move || equi_merge(&left, &right)),
            );
            let mut left_positions = PosList::new();
            let mut right_positions = PosList::new();
            for (left, right) in merged {
                left_positions.extend(left);
                right_positions.extend(right);
            }
            Ok((left_positions, right_positions))
        } else {
            let left: MaterializedColumn<T> = left_clusters.into_iter().flatten().collect();
            let right: MaterializedColumn<T> = right_clusters.into_iter().flatten().collect();
            Ok(non_equi_merge(self.scan_type, &left, &right))
        }
    }
}

/// Largest power of two not above the larger input's chunk count.
fn default_cluster_count(left: &Table, right: &Table) -> usize {
    let chunks = left.chunk_count().max(right.chunk_count()).max(1) as usize;
    1 << (usize::BITS - 1 - chunks.leading_zeros())
}

/// Merge two sorted lists, emitting the cross product of every run of equal values.
fn equi_merge<T: ColumnType>(
    left: &[MaterializedValue<T>],
    right: &[MaterializedValue<T>],
) -> (PosList, PosList) {
    let mut left_positions = PosList::new();
    let mut right_positions = PosList::new();
    let (mut l, mut r) = (0, 0);

    while l < left.len() && r < right.len() {
        match left[l].value.total_cmp(&right[r].value) {
            Ordering::Less => l += 1,
            Ordering::Greater => r += 1,
            Ordering::Equal => {
                let value = &left[l].value;
                let left_end = l + left[l..]
                    .iter()
                    .take_while(|entry| entry.value.total_cmp(value) == Ordering::Equal)
                    .count();
                let right_end = r + right[r..]
                    .iter()
                    .take_while(|entry| entry.value.total_cmp(value) == Ordering::Equal)
                    .count();
                for left_entry in &left[l..left_end] {
                    for right_entry in &right[r..right_end] {
                        left_positions.push(left_entry.row_id);
                        right_positions.push(right_entry.row_id);
                    }
                }
                l = left_end;
                r = right_end;
            }
        }
    }
    (left_positions, right_positions)
}

/// Pair each left value with every right value satisfying `left <op> right`.
/// `right` must be sorted.
fn non_equi_merge<T: ColumnType>(
    scan_type: ScanType,
    left: &[MaterializedValue<T>],
    right: &[MaterializedValue<T>],
) -> (PosList, PosList) {
    let mut left_positions = PosList::new();
    let mut right_positions = PosList::new();

    for left_entry in left {
        let value = &left_entry.value;
        let below = |entry: &MaterializedValue<T>| entry.value.total_cmp(value) == Ordering::Less;
        let at_most = |entry: &MaterializedValue<T>| entry.value.total_cmp(value) != Ordering::Greater;
        let matches = match scan_type {
            ScanType::LessThan => &right[right.partition_point(at_most)..],
            ScanType::LessThanEquals => &right[right.partition_point(below)..],
            ScanType::GreaterThan => &right[..right.partition_point(below)],
            ScanType::GreaterThanEquals => &right[..right.partition_point(at_most)],
            ScanType::Equals | ScanType::NotEquals | ScanType::Between => &right[..0],
        };
        for right_entry in matches {
            left_positions.push(left_entry.row_id);
            right_positions.push(right_entry.row_id);
        }
    }
    (left_positions, right_positions)
}
