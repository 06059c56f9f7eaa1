//! Task scheduling.
//!
//! Operators split their work into [`Task`]s and hand them to the
//! [`CurrentScheduler`]. When a [`TaskScheduler`] is installed, tasks run on its
//! worker pool; otherwise they run inline.

mod current_scheduler;
mod task;
mod task_scheduler;

pub use current_scheduler::CurrentScheduler;
pub use task::{Task, TaskId};
pub use task_scheduler::TaskScheduler;
