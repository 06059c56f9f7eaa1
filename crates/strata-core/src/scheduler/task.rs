//! Units of work executed by the scheduler.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use super::CurrentScheduler;

/// Unique task identifier.
pub type TaskId = u64;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

type TaskBody = Box<dyn FnOnce() + Send + 'static>;

enum TaskState {
    Pending,
    Done,
    Panicked(Option<Box<dyn Any + Send>>),
}

/// A closure that runs exactly once, on a worker or inline.
///
/// A task that panics is marked done; the panic is re-raised in whoever
/// joins it, so workers never die from a failing task.
pub struct Task {
    id: TaskId,
    body: Mutex<Option<TaskBody>>,
    state: Mutex<TaskState>,
    finished: Condvar,
}

impl Task {
    pub fn new<F>(body: F) -> Arc<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Arc::new(Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            body: Mutex::new(Some(Box::new(body))),
            state: Mutex::new(TaskState::Pending),
            finished: Condvar::new(),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Hand the task to the current scheduler, or run it inline if none is installed.
    pub fn schedule(self: &Arc<Self>) {
        CurrentScheduler::schedule(Arc::clone(self));
    }

    pub fn is_done(&self) -> bool {
        !matches!(*self.state.lock(), TaskState::Pending)
    }

    /// Run the body if it has not run yet.
    pub(crate) fn execute(&self) {
        let Some(body) = self.body.lock().take() else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(body));
        let mut state = self.state.lock();
        *state = match outcome {
            Ok(()) => TaskState::Done,
            Err(payload) => {
                warn!(task_id = self.id, "Task panicked");
                TaskState::Panicked(Some(payload))
            }
        };
        drop(state);
        self.finished.notify_all();
    }

    /// Block until the task has run. Re-raises the task's panic, if any.
    ///
    /// Joining a task that is never scheduled blocks forever.
    pub fn join(&self) {
        let mut state = self.state.lock();
        while matches!(*state, TaskState::Pending) {
            self.finished.wait(&mut state);
        }
        if let TaskState::Panicked(payload) = &mut *state {
            let payload = payload.take();
            drop(state);
            match payload {
                Some(payload) => panic::resume_unwind(payload),
                None => panic!("task {} panicked", self.id),
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_execute_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = {
            let counter = Arc::clone(&counter);
            Task::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(!task.is_done());
        task.execute();
        task.execute();
        task.join();

        assert!(task.is_done());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Task::new(|| {});
        let b = Task::new(|| {});
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_panic_is_reraised_on_join() {
        let task = Task::new(|| panic!("boom"));
        task.execute();
        assert!(task.is_done());

        let result = panic::catch_unwind(AssertUnwindSafe(|| task.join()));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }
}
