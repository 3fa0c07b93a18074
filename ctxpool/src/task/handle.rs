use super::state::{CANCELLED, COMPLETED, QUEUED, RUNNING};
use crate::error::TaskError;

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// State shared between a queued task and its handle.
pub(crate) struct Shared<T> {
    /// Lifecycle state (QUEUED, RUNNING, ...).
    state: AtomicUsize,

    /// Outcome and the async waiters interested in it.
    slot: Mutex<Slot<T>>,

    /// Wakes threads blocked in [`TaskHandle::join`].
    ready: Condvar,
}

struct Slot<T> {
    outcome: Option<Result<T, TaskError>>,
    waiters: Vec<Waker>,
}

impl<T> Shared<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicUsize::new(QUEUED),
            slot: Mutex::new(Slot {
                outcome: None,
                waiters: Vec::new(),
            }),
            ready: Condvar::new(),
        }
    }

    /// Claims the task for execution.
    ///
    /// Returns `false` if the task was cancelled or already claimed.
    pub(crate) fn begin(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Cancels the task if it has not started yet.
    ///
    /// On success the handle resolves with [`TaskError::Cancelled`].
    pub(crate) fn cancel(&self) -> bool {
        if self
            .state
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.publish(Err(TaskError::Cancelled));
        true
    }

    /// Publishes the outcome of a task that ran.
    pub(crate) fn complete(&self, outcome: Result<T, TaskError>) {
        self.state.store(COMPLETED, Ordering::Release);
        self.publish(outcome);
    }

    pub(crate) fn is_finished(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), COMPLETED | CANCELLED)
    }

    /// Stores the outcome, then wakes blocked joiners and async waiters.
    fn publish(&self, outcome: Result<T, TaskError>) {
        let waiters = {
            let mut slot = self.slot.lock();
            slot.outcome = Some(outcome);
            mem::take(&mut slot.waiters)
        };

        self.ready.notify_all();

        for waker in waiters {
            waker.wake();
        }
    }
}

/// A handle to a submitted task.
///
/// A `TaskHandle` resolves once the task has completed, failed, or been
/// cancelled. It can be consumed synchronously with [`join`](Self::join),
/// or awaited, since it implements [`Future`].
///
/// Dropping the `TaskHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct TaskHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Blocks the calling thread until the task's outcome is available.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Failed`] if the unit of work returned an error,
    /// [`TaskError::Panicked`] if it panicked, and [`TaskError::Cancelled`]
    /// if it never started.
    pub fn join(self) -> Result<T, TaskError> {
        let mut slot = self.shared.slot.lock();

        loop {
            if let Some(outcome) = slot.outcome.take() {
                return outcome;
            }

            self.shared.ready.wait(&mut slot);
        }
    }

    /// Waits up to `timeout` for the task to finish without consuming its
    /// outcome.
    ///
    /// Returns `true` if the outcome is available. A timeout too large to
    /// express as a deadline waits without limit.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.slot.lock();

        while slot.outcome.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                        return slot.outcome.is_some();
                    }
                }
                None => self.shared.ready.wait(&mut slot),
            }
        }

        true
    }

    /// Cancels the task if no worker has started it yet.
    ///
    /// Returns `true` if the task was cancelled; it will never run and the
    /// handle resolves to [`TaskError::Cancelled`]. Once execution has
    /// begun, cancellation is not possible and `false` is returned.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Returns `true` if the task completed or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }
}

impl<T> Future for TaskHandle<T> {
    /// The outcome of the submitted task.
    type Output = Result<T, TaskError>;

    /// Polls the handle.
    ///
    /// The waker is registered under the same lock that guards the
    /// outcome, so a completion racing with this poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();

        if let Some(outcome) = slot.outcome.take() {
            return Poll::Ready(outcome);
        }

        if !slot.waiters.iter().any(|w| w.will_wake(cx.waker())) {
            slot.waiters.push(cx.waker().clone());
        }

        Poll::Pending
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.shared.state.load(Ordering::Acquire) {
            QUEUED => "queued",
            RUNNING => "running",
            COMPLETED => "completed",
            _ => "cancelled",
        };

        f.debug_struct("TaskHandle").field("state", &state).finish()
    }
}
