use super::core::PoolShared;
use super::queue::Take;
use crate::task::Runnable;

use std::cell::Cell;
use std::sync::Arc;

use tracing::debug;

thread_local! {
    /// Identifier of the pool worker running on this thread, if any.
    static CURRENT_WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };

    /// Address of the shared state of the pool owning this thread, or zero.
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// Returns the id of the pool worker running on the calling thread.
///
/// Ids are assigned from zero in spawn order and are unique within one
/// pool. Returns `None` on threads that are not pool workers.
pub fn worker_id() -> Option<usize> {
    CURRENT_WORKER_ID.with(Cell::get)
}

/// Returns `true` if the calling thread is one of `pool`'s workers.
pub(crate) fn is_worker_of(pool: &Arc<PoolShared>) -> bool {
    CURRENT_POOL.with(Cell::get) == pool_address(pool)
}

fn pool_address(pool: &Arc<PoolShared>) -> usize {
    Arc::as_ptr(pool) as usize
}

/// Whether a worker lives for the whole pool or only while busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerKind {
    /// Spawned at construction; waits for work until shutdown.
    Core,

    /// Spawned by a submitter when the backlog was full; exits after
    /// `keep_alive` without work.
    Burst,
}

/// A worker thread in the pool.
///
/// A worker runs one task at a time, for its whole lifetime. Before it
/// returns to the backlog for another task, the task's propagation has
/// already put the thread's context back the way it found it.
pub(crate) struct Worker {
    /// Unique identifier of the worker.
    id: usize,

    /// Lifetime policy.
    kind: WorkerKind,

    /// State shared with the pool handle and the other workers.
    pool: Arc<PoolShared>,
}

impl Worker {
    pub(crate) fn new(id: usize, kind: WorkerKind, pool: Arc<PoolShared>) -> Self {
        Self { id, kind, pool }
    }

    /// Runs the worker loop.
    ///
    /// # Execution loop
    ///
    /// - Run `first`, the task that caused a burst worker to be spawned
    /// - Take the oldest task from the backlog and run it
    /// - Park while the backlog is empty
    /// - Exit when the backlog is closed and drained, or, for burst
    ///   workers, after `keep_alive` without work
    pub(crate) fn run(self, first: Option<Box<dyn Runnable>>) {
        CURRENT_WORKER_ID.with(|id| id.set(Some(self.id)));
        CURRENT_POOL.with(|pool| pool.set(pool_address(&self.pool)));
        debug!(worker = self.id, kind = ?self.kind, "worker started");

        if let Some(task) = first {
            task.run();
        }

        let idle_timeout = match self.kind {
            WorkerKind::Core => None,
            WorkerKind::Burst => Some(self.pool.config.keep_alive()),
        };

        loop {
            match self.pool.backlog.take(idle_timeout) {
                Take::Task(task) => task.run(),
                Take::Idle => {
                    debug!(worker = self.id, "burst worker idle, retiring");
                    break;
                }
                Take::Closed => break,
            }
        }

        self.pool.worker_exited();
        debug!(worker = self.id, "worker exiting");
    }
}
