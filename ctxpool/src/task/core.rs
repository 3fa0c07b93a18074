use super::handle::{Shared, TaskHandle};
use crate::context::value::AuthContext;
use crate::error::TaskError;
use crate::pool::worker::worker_id;
use crate::propagation::Propagation;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace, warn};

/// A unit of work as submitted by the caller.
pub(crate) type Work<T> = Box<dyn FnOnce() -> anyhow::Result<T> + Send>;

/// A queued unit of work that a worker can execute.
///
/// The `Runnable` trait erases the task's output type so the backlog can
/// hold tasks of any result type as `Box<dyn Runnable>`.
pub(crate) trait Runnable: Send {
    /// Executes the task on the calling worker thread.
    fn run(self: Box<Self>);

    /// Returns `true` if the task no longer needs a worker, for example
    /// because it was cancelled while queued.
    fn is_finished(&self) -> bool {
        false
    }
}

/// A submitted unit of work together with the context captured for it.
///
/// The context is captured on the submitting thread before the task is
/// queued. It is only meaningful under [`Propagation::CaptureAndRestore`];
/// the other strategies leave it empty.
///
/// A task that is dropped without having run (discarded on shutdown, or
/// lost because its burst worker could not start) resolves its handle
/// with [`TaskError::Cancelled`].
pub(crate) struct Task<T> {
    /// The closure to run. Taken exactly once, by [`Task::run`].
    work: Option<Work<T>>,

    /// Snapshot of the submitter's context.
    captured: Option<AuthContext>,

    /// Strategy applied around execution.
    propagation: Propagation,

    /// Outcome slot shared with the [`TaskHandle`].
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a queued task and the handle that observes it.
    pub(crate) fn new(
        work: Work<T>,
        captured: Option<AuthContext>,
        propagation: Propagation,
    ) -> (Self, TaskHandle<T>) {
        let shared = Arc::new(Shared::new());

        let task = Self {
            work: Some(work),
            captured,
            propagation,
            shared: shared.clone(),
        };

        (task, TaskHandle::new(shared))
    }

    /// Runs the unit of work and publishes its outcome.
    ///
    /// The task only runs if it is still queued; a cancelled task is
    /// skipped. Panics are caught here so the worker thread survives, and
    /// the propagation strategy has already restored the worker's context
    /// by the time the outcome is published.
    fn execute(mut self: Box<Self>) {
        let Some(work) = self.work.take() else {
            return;
        };

        if !self.shared.begin() {
            trace!(worker = ?worker_id(), "skipping cancelled task");
            return;
        }

        let captured = self.captured.take();
        let propagation = self.propagation;

        trace!(
            worker = ?worker_id(),
            principal = ?captured.as_ref().map(AuthContext::principal),
            ?propagation,
            "running task"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| propagation.run_with(captured, work)));

        let outcome = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                debug!(worker = ?worker_id(), error = %format!("{err:#}"), "task failed");
                Err(TaskError::Failed(err))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(worker = ?worker_id(), %message, "task panicked");
                Err(TaskError::Panicked(message))
            }
        };

        self.shared.complete(outcome);
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Box<Self>) {
        self.execute();
    }

    fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if self.shared.cancel() {
            debug!("discarded task that never started");
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
