//! Fixed-size worker pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::task::Task;
use crate::config::SchedulerConfig;
use crate::error::Error;

/// Pool of worker threads draining a shared task queue.
///
/// Tasks run in FIFO order of submission per worker; no ordering between
/// workers is guaranteed. Tasks scheduled after [`finish`](Self::finish) run
/// inline on the caller's thread.
pub struct TaskScheduler {
    sender: Mutex<Option<Sender<Arc<Task>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    scheduled: AtomicU64,
}

impl TaskScheduler {
    /// Spawn the worker threads.
    pub fn new(config: SchedulerConfig) -> Result<Self, Error> {
        config.validate()?;

        let (sender, receiver) = unbounded::<Arc<Task>>();
        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, worker_id))
                .spawn(move || Self::worker_loop(worker_id, receiver))?;
            workers.push(handle);
        }

        info!(workers = config.worker_count, "Task scheduler started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count: config.worker_count,
            scheduled: AtomicU64::new(0),
        })
    }

    fn worker_loop(worker_id: usize, receiver: Receiver<Arc<Task>>) {
        trace!(worker_id, "Worker started");
        for task in receiver.iter() {
            trace!(worker_id, task_id = task.id(), "Executing task");
            task.execute();
        }
        trace!(worker_id, "Worker stopped");
    }

    /// Queue a task for execution.
    pub fn schedule(&self, task: Arc<Task>) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => {
                if let Err(SendError(task)) = sender.send(task) {
                    task.execute();
                }
            }
            None => task.execute(),
        }
    }

    /// Block until every task has run.
    pub fn wait_for_tasks(&self, tasks: &[Arc<Task>]) {
        for task in tasks {
            task.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of tasks handed to this scheduler so far.
    pub fn scheduled_count(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Drain the queue and join the workers. Idempotent.
    pub fn finish(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for handle in workers {
            // A worker dropping the last handle to its own pool must not join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("Scheduler worker terminated abnormally");
            }
        }

        debug!(
            scheduled = self.scheduled.load(Ordering::Relaxed),
            "Task scheduler finished"
        );
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("worker_count", &self.worker_count)
            .field("scheduled", &self.scheduled_count())
            .field("finished", &self.is_finished())
            .finish()
    }
}
