//! Process-wide scheduler slot.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::task::Task;
use super::task_scheduler::TaskScheduler;
use crate::config::SchedulerConfig;
use crate::error::Error;

static CURRENT: RwLock<Option<Arc<TaskScheduler>>> = parking_lot::const_rwlock(None);

/// Access to the scheduler that operators hand their tasks to.
///
/// With no scheduler installed every task runs inline on the scheduling
/// thread, which keeps single-threaded tests and tools deterministic.
pub struct CurrentScheduler;

impl CurrentScheduler {
    /// Create a scheduler from `config` and install it.
    pub fn init(config: SchedulerConfig) -> Result<Arc<TaskScheduler>, Error> {
        let scheduler = Arc::new(TaskScheduler::new(config)?);
        Self::set(Arc::clone(&scheduler));
        Ok(scheduler)
    }

    /// Install `scheduler`, finishing the previously installed one.
    pub fn set(scheduler: Arc<TaskScheduler>) {
        let previous = CURRENT.write().replace(scheduler);
        if let Some(previous) = previous {
            debug!("Replacing installed task scheduler");
            previous.finish();
        }
    }

    pub fn get() -> Option<Arc<TaskScheduler>> {
        CURRENT.read().clone()
    }

    pub fn is_set() -> bool {
        CURRENT.read().is_some()
    }

    /// Hand `task` to the installed scheduler, or run it now.
    pub fn schedule(task: Arc<Task>) {
        match Self::get() {
            Some(scheduler) => scheduler.schedule(task),
            None => task.execute(),
        }
    }

    /// Block until every task has run, re-raising the first panic.
    pub fn wait_for_tasks(tasks: &[Arc<Task>]) {
        for task in tasks {
            task.join();
        }
    }

    /// Schedule `tasks` and wait for all of them.
    pub fn schedule_and_wait(tasks: &[Arc<Task>]) {
        for task in tasks {
            task.schedule();
        }
        Self::wait_for_tasks(tasks);
    }

    /// Run every job as its own task and collect the results in job order.
    pub fn run_all<R, F, I>(jobs: I) -> Vec<R>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let jobs: Vec<F> = jobs.into_iter().collect();
        let slots: Arc<Vec<Mutex<Option<R>>>> =
            Arc::new((0..jobs.len()).map(|_| Mutex::new(None)).collect());

        let tasks: Vec<Arc<Task>> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let slots = Arc::clone(&slots);
                Task::new(move || {
                    let result = job();
                    *slots[index].lock() = Some(result);
                })
            })
            .collect();
        Self::schedule_and_wait(&tasks);

        slots
            .iter()
            .map(|slot| {
                slot.lock()
                    .take()
                    .expect("finished task did not publish its result")
            })
            .collect()
    }

    /// Uninstall and finish the current scheduler.
    pub fn shutdown() {
        let previous = CURRENT.write().take();
        if let Some(previous) = previous {
            previous.finish();
        }
    }

    /// Return to inline execution between tests.
    #[doc(hidden)]
    pub fn reset() {
        Self::shutdown();
    }
}
