//! Partitioning and sorting of both join inputs.
//!
//! Both sides are materialized and split into the same number of clusters so
//! that matching rows always land in clusters with the same index:
//!
//! * equi-joins cluster on the low bits of the join key (radix clustering);
//! * non-equi joins cluster on value ranges whose split points are sampled
//!   from the pre-sorted chunks of both sides, so cluster `i` only holds values
//!   below those of cluster `i + 1`.
//!
//! Every cluster is finally sorted by value.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use super::column_materializer::{
    materialized_size, ColumnMaterializer, MaterializedColumn, MaterializedColumnList,
};
use crate::error::Error;
use crate::scheduler::{CurrentScheduler, Task};
use crate::storage::Table;
use crate::types::{ColumnId, ColumnType};

/// Clusters and sorts the join columns of two tables.
#[derive(Debug)]
pub struct RadixClusterSort<T> {
    left: Arc<Table>,
    right: Arc<Table>,
    column_ids: (ColumnId, ColumnId),
    equi_case: bool,
    cluster_count: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ColumnType> RadixClusterSort<T> {
    /// `cluster_count` must be a power of two.
    pub fn new(
        left: Arc<Table>,
        right: Arc<Table>,
        column_ids: (ColumnId, ColumnId),
        equi_case: bool,
        cluster_count: usize,
    ) -> Result<Self, Error> {
        if cluster_count == 0 || !cluster_count.is_power_of_two() {
            return Err(Error::InvalidConfiguration(format!(
                "cluster count must be a power of two, got {cluster_count}"
            )));
        }
        Ok(Self {
            left,
            right,
            column_ids,
            equi_case,
            cluster_count,
            _marker: PhantomData,
        })
    }

    /// Sorted clusters of the left and right join column.
    #[instrument(skip(self), fields(cluster_count = self.cluster_count, equi_case = self.equi_case))]
    pub fn execute(&self) -> Result<(MaterializedColumnList<T>, MaterializedColumnList<T>), Error> {
        // Range clustering samples split values from sorted chunks.
        let materializer = ColumnMaterializer::new(!self.equi_case);
        let chunks_left = materializer.materialize::<T>(&self.left, self.column_ids.0)?;
        let chunks_right = materializer.materialize::<T>(&self.right, self.column_ids.1)?;

        let (mut output_left, mut output_right) = if self.cluster_count == 1 {
            (concatenate(chunks_left), concatenate(chunks_right))
        } else if self.equi_case {
            let mask = (self.cluster_count - 1) as u32;
            let clusterer = move |value: &T| value.radix(mask) as usize;
            (
                self.cluster(chunks_left, clusterer),
                self.cluster(chunks_right, clusterer),
            )
        } else {
            self.range_cluster(chunks_left, chunks_right)
        };

        sort_clusters(&mut output_left);
        sort_clusters(&mut output_right);

        assert_eq!(
            materialized_size(&output_left),
            self.left.row_count(),
            "left side lost rows while clustering"
        );
        assert_eq!(
            materialized_size(&output_right),
            self.right.row_count(),
            "right side lost rows while clustering"
        );

        debug!(
            left_rows = self.left.row_count(),
            right_rows = self.right.row_count(),
            "Clustered join inputs"
        );
        Ok((output_left, output_right))
    }

    /// Distribute all values into clusters, one task per input chunk.
    ///
    /// Each task owns its chunk; clusters are shared and guarded by one lock each.
    fn cluster<F>(&self, input: MaterializedColumnList<T>, clusterer: F) -> MaterializedColumnList<T>
    where
        F: Fn(&T) -> usize + Send + Sync + 'static,
    {
        let cluster_size = materialized_size(&input) / self.cluster_count;
        let output: Arc<Vec<Mutex<MaterializedColumn<T>>>> = Arc::new(
            (0..self.cluster_count)
                .map(|_| Mutex::new(Vec::with_capacity(cluster_size)))
                .collect(),
        );
        let clusterer = Arc::new(clusterer);

        let tasks: Vec<Arc<Task>> = input
            .into_iter()
            .map(|chunk| {
                let output = Arc::clone(&output);
                let clusterer = Arc::clone(&clusterer);
                let task = Task::new(move || {
                    for entry in chunk {
                        let cluster_id = clusterer(&entry.value);
                        output[cluster_id].lock().push(entry);
                    }
                });
                task.schedule();
                task
            })
            .collect();
        CurrentScheduler::wait_for_tasks(&tasks);
        drop(tasks);

        match Arc::try_unwrap(output) {
            Ok(clusters) => clusters.into_iter().map(Mutex::into_inner).collect(),
            Err(shared) => shared
                .iter()
                .map(|cluster| std::mem::take(&mut *cluster.lock()))
                .collect(),
        }
    }

    /// Cluster both sides on value ranges, with split values sampled from both.
    fn range_cluster(
        &self,
        left: MaterializedColumnList<T>,
        right: MaterializedColumnList<T>,
    ) -> (MaterializedColumnList<T>, MaterializedColumnList<T>) {
        let mut samples: Vec<Vec<(T, usize)>> = vec![Vec::new(); self.cluster_count - 1];
        self.pick_sample_values(&mut samples, &left);
        self.pick_sample_values(&mut samples, &right);

        let split_values: Arc<Vec<T>> = Arc::new(samples.into_iter().filter_map(most_common).collect());
        let last_cluster = self.cluster_count - 1;
        let clusterer = move |value: &T| {
            split_values
                .iter()
                .position(|split| value.total_cmp(split) != Ordering::Greater)
                .unwrap_or(last_cluster)
        };

        (
            self.cluster(left, clusterer.clone()),
            self.cluster(right, clusterer),
        )
    }

    /// Vote for split values: from every sorted chunk, take the values at the
    /// `1/n, 2/n, ..` quantiles as candidates for the matching boundary.
    fn pick_sample_values(&self, samples: &mut [Vec<(T, usize)>], table: &MaterializedColumnList<T>) {
        for chunk in table.iter().filter(|chunk| !chunk.is_empty()) {
            for (boundary, candidates) in samples.iter_mut().enumerate() {
                let index = chunk.len() * (boundary + 1) / self.cluster_count;
                let value = &chunk[index].value;
                match candidates
                    .iter_mut()
                    .find(|(candidate, _)| candidate.total_cmp(value) == Ordering::Equal)
                {
                    Some((_, votes)) => *votes += 1,
                    None => candidates.push((value.clone(), 1)),
                }
            }
        }
    }
}

/// Most voted value; ties go to the value seen first.
fn most_common<T>(candidates: Vec<(T, usize)>) -> Option<T> {
    let mut best: Option<(T, usize)> = None;
    for (value, votes) in candidates {
        if best.as_ref().map_or(true, |(_, best_votes)| votes > *best_votes) {
            best = Some((value, votes));
        }
    }
    best.map(|(value, _)| value)
}

fn concatenate<T>(input: MaterializedColumnList<T>) -> MaterializedColumnList<T> {
    vec![input.into_iter().flatten().collect()]
}

fn sort_clusters<T: ColumnType>(clusters: &mut MaterializedColumnList<T>) {
    for cluster in clusters.iter_mut() {
        cluster.sort_by(|a, b| a.value.total_cmp(&b.value));
    }
}
