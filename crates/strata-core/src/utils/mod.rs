//! Supporting utilities.

mod pausable_loop_thread;

pub use pausable_loop_thread::{LoopState, PausableLoopThread};
