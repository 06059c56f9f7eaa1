//! Engine configuration.

use std::thread;

use crate::error::Error;

/// Default maximum number of rows per chunk for tables created by operators.
///
/// Zero means unbounded: a table keeps appending to its last chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: u32 = 0;

/// Configuration for the task scheduler's worker pool.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Prefix of worker thread names; workers are named `{prefix}-{index}`.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: thread::available_parallelism().map_or(4, |n| n.get()),
            thread_name: "strata-worker".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with a fixed number of workers.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Set the number of worker threads.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.worker_count == 0 {
            return Err(Error::InvalidConfiguration(
                "scheduler needs at least one worker".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for sort-merge joins.
#[derive(Debug, Clone, Default)]
pub struct JoinConfig {
    /// Number of radix/range clusters. None derives it from the input chunk counts.
    pub cluster_count: Option<usize>,
}

impl JoinConfig {
    /// Use a fixed cluster count.
    pub fn with_cluster_count(mut self, cluster_count: usize) -> Self {
        self.cluster_count = Some(cluster_count);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        match self.cluster_count {
            Some(count) if count == 0 || !count.is_power_of_two() => {
                Err(Error::InvalidConfiguration(format!(
                    "cluster count must be a power of two, got {count}"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_builders() {
        let config = SchedulerConfig::new(2).with_thread_name("bench");
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.thread_name, "bench");
        assert!(config.validate().is_ok());
        assert!(SchedulerConfig::new(0).validate().is_err());
    }

    #[test]
    fn test_join_config_rejects_non_power_of_two() {
        assert!(JoinConfig::default().validate().is_ok());
        assert!(JoinConfig::default().with_cluster_count(8).validate().is_ok());
        assert!(JoinConfig::default().with_cluster_count(6).validate().is_err());
        assert!(JoinConfig::default().with_cluster_count(0).validate().is_err());
    }
}
