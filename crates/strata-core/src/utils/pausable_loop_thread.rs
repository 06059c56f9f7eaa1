//! Background thread that runs a closure in a loop, with pause and resume.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::Error;

/// Lifecycle state of a [`PausableLoopThread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    ShuttingDown,
}

struct Shared {
    state: Mutex<LoopState>,
    changed: Condvar,
}

/// Runs `body(counter)` repeatedly on its own thread, sleeping `interval`
/// before each iteration. `counter` starts at zero and grows by one per
/// completed iteration, across pauses.
///
/// State changes wake the sleeping thread immediately, so [`finish`](Self::finish)
/// never waits out a long interval.
pub struct PausableLoopThread {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PausableLoopThread {
    /// Start the loop.
    pub fn new<F>(interval: Duration, body: F) -> Result<Self, Error>
    where
        F: FnMut(usize) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(LoopState::Running),
            changed: Condvar::new(),
        });
        let loop_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("strata-loop".to_string())
            .spawn(move || Self::run(loop_shared, interval, body))?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn run<F>(shared: Arc<Shared>, interval: Duration, mut body: F)
    where
        F: FnMut(usize),
    {
        let mut counter = 0usize;
        loop {
            let mut state = shared.state.lock();

            if !interval.is_zero() {
                let deadline = Instant::now() + interval;
                while *state != LoopState::ShuttingDown {
                    if shared.changed.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
            }
            while *state == LoopState::Paused {
                shared.changed.wait(&mut state);
            }
            if *state == LoopState::ShuttingDown {
                debug!(iterations = counter, "Loop thread stopped");
                return;
            }
            drop(state);

            body(counter);
            counter += 1;
        }
    }

    /// Stop iterating after the current iteration. No effect unless running.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock();
        if *state == LoopState::Running {
            *state = LoopState::Paused;
        }
    }

    /// Continue a paused loop. No effect unless paused.
    pub fn resume(&self) {
        let mut state = self.shared.state.lock();
        if *state == LoopState::Paused {
            *state = LoopState::Running;
            self.shared.changed.notify_all();
        }
    }

    /// Stop the loop and join the thread. Idempotent.
    pub fn finish(&self) {
        *self.shared.state.lock() = LoopState::ShuttingDown;
        self.shared.changed.notify_all();

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("Loop thread body panicked");
            }
        }
    }

    pub fn state(&self) -> LoopState {
        *self.shared.state.lock()
    }
}

impl Drop for PausableLoopThread {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wait_for(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_counter_continues_after_resume() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let worker = PausableLoopThread::new(Duration::from_millis(1), move |counter| {
            recorder.lock().push(counter);
        })
        .unwrap();

        wait_for(|| seen.lock().len() >= 3);
        worker.pause();
        assert_eq!(worker.state(), LoopState::Paused);
        // Let an in-flight iteration complete before sampling.
        thread::sleep(Duration::from_millis(20));
        let paused_at = seen.lock().len();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(seen.lock().len(), paused_at);

        worker.resume();
        wait_for(|| seen.lock().len() >= paused_at + 3);
        worker.finish();

        let seen = seen.lock();
        let expected: Vec<usize> = (0..seen.len()).collect();
        assert_eq!(*seen, expected);
    }

    #[test]
    fn test_finish_interrupts_long_sleep() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let worker = PausableLoopThread::new(Duration::from_secs(3600), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let started = Instant::now();
        worker.finish();
        worker.finish();

        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(worker.state(), LoopState::ShuttingDown);
    }

    #[test]
    fn test_finish_while_paused() {
        let worker = PausableLoopThread::new(Duration::ZERO, |_| thread::yield_now()).unwrap();
        worker.pause();
        worker.finish();
        assert_eq!(worker.state(), LoopState::ShuttingDown);

        // Resume after shutdown stays shut down.
        worker.resume();
        assert_eq!(worker.state(), LoopState::ShuttingDown);
    }

    #[test]
    fn test_drop_stops_thread() {
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&runs);
            let _worker = PausableLoopThread::new(Duration::from_millis(1), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            wait_for(|| runs.load(Ordering::SeqCst) > 0);
        }
        let after_drop = runs.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(runs.load(Ordering::SeqCst), after_drop);
    }
}
