//! Owned UI timers.
//!
//! Every view that animates or auto-dismisses something owns one
//! [`Scheduler`]. Callbacks run on the Tokio runtime after their delay;
//! dropping the scheduler (tearing the view down) aborts whatever is still
//! pending, so no callback ever fires against a view that is gone.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};

/// Handle to one scheduled callback.
#[derive(Debug, Clone)]
pub struct TimerHandle(AbortHandle);

impl TimerHandle {
    /// Cancel the callback if it has not run yet.
    pub fn cancel(&self) {
        self.0.abort();
    }

    /// Whether the callback has run or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

/// Single owner of a view's pending timers.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `callback` after `delay`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        let handle = TimerHandle(task.abort_handle());

        let mut tasks = self.tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
        handle
    }

    /// Number of callbacks that have neither run nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks().iter().filter(|task| !task.is_finished()).count()
    }

    /// Abort every pending callback.
    pub fn cancel_all(&self) {
        for task in self.tasks().drain(..) {
            task.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
