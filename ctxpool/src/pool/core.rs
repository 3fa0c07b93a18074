use super::builder::PoolBuilder;
use super::config::{PoolConfig, RejectionPolicy, ShutdownPolicy};
use super::queue::{Backlog, Offer};
use super::worker::{Worker, WorkerKind, is_worker_of};
use crate::error::{BuildError, SubmitError};
use crate::propagation::Propagation;
use crate::task::{Runnable, TaskHandle};

use std::fmt;
use std::io;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

/// State shared between the pool handle and its workers.
pub(crate) struct PoolShared {
    /// Bounded queue of tasks waiting for a worker.
    pub(crate) backlog: Backlog,

    /// Immutable construction parameters.
    pub(crate) config: PoolConfig,

    /// Number of workers currently alive (core and burst).
    pub(crate) live: AtomicUsize,

    /// Next worker id to hand out.
    next_id: AtomicUsize,

    /// Join handles of every worker spawned so far.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Signalled under `handles` each time a worker leaves its loop.
    exited: Condvar,
}

impl PoolShared {
    /// Spawns a worker thread, optionally seeded with its first task.
    ///
    /// The caller must already have counted the worker in `live`.
    fn spawn_worker(
        self: &Arc<Self>,
        kind: WorkerKind,
        first: Option<Box<dyn Runnable>>,
    ) -> io::Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let builder =
            thread::Builder::new().name(format!("{}{}", self.config.thread_name_prefix, id + 1));

        let worker = Worker::new(id, kind, self.clone());
        let handle = self
            .config
            .propagation
            .spawn_worker(builder, move || worker.run(first))?;

        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);

        Ok(())
    }

    /// Removes an exiting (or never started) worker from `live` and wakes
    /// joiners.
    pub(crate) fn worker_exited(&self) {
        let _handles = self.handles.lock();
        self.live.fetch_sub(1, Ordering::AcqRel);
        self.exited.notify_all();
    }

    /// Reserves a slot for a burst worker if the pool is below
    /// `max_threads`.
    fn try_reserve_burst(&self) -> bool {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.config.max_threads).then_some(live + 1)
            })
            .is_ok()
    }
}

/// A pool of reusable worker threads that propagates the submitter's
/// [`AuthContext`](crate::AuthContext) according to one fixed
/// [`Propagation`].
///
/// `ContextPool` is responsible for:
/// - spawning `core_threads` workers up front,
/// - accepting units of work from any number of threads concurrently,
/// - capturing the submitter's context before a task is queued,
/// - adding burst workers up to `max_threads` when the backlog is full,
/// - applying the configured rejection and shutdown policies.
///
/// Dropping the pool shuts it down and waits for its workers.
///
/// # Ordering
///
/// No ordering is promised between tasks, not even between tasks from the
/// same submitter once more than one worker exists.
pub struct ContextPool {
    shared: Arc<PoolShared>,
}

impl fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPool")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl ContextPool {
    /// Returns a builder with default configuration.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Validates `config` and spawns the core workers.
    pub(crate) fn start(config: PoolConfig) -> Result<Self, BuildError> {
        config.validate()?;

        let shared = Arc::new(PoolShared {
            backlog: Backlog::new(config.queue_capacity),
            config,
            live: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
            exited: Condvar::new(),
        });

        // On error, dropping `pool` stops the workers spawned so far.
        let pool = Self { shared };

        for _ in 0..pool.shared.config.core_threads {
            pool.shared.live.fetch_add(1, Ordering::AcqRel);

            if let Err(err) = pool.shared.spawn_worker(WorkerKind::Core, None) {
                pool.shared.worker_exited();
                return Err(BuildError::Spawn(err));
            }
        }

        let config = &pool.shared.config;
        debug!(
            core_threads = config.core_threads,
            max_threads = config.max_threads,
            queue_capacity = config.queue_capacity,
            propagation = %config.propagation,
            rejection = %config.rejection,
            shutdown = %config.shutdown,
            "pool started"
        );

        Ok(pool)
    }

    /// Submits a unit of work and returns a handle to its outcome.
    ///
    /// The submitter's context is captured here, synchronously, before the
    /// task is queued; changing the context after `submit` returns does not
    /// affect what the task sees. `submit` never waits for the task to run.
    ///
    /// When the backlog is full, a burst worker is spawned from this thread
    /// if the pool is below `max_threads`, and the task becomes its first
    /// task. Otherwise the rejection policy applies: `Block` waits for a free
    /// slot, `Reject` fails.
    ///
    /// Submitting from inside a running task captures the context current on
    /// that worker. Under [`Propagation::CaptureAndRestore`] that is the outer
    /// task's context. With [`RejectionPolicy::Block`], a nested submission
    /// can wait on a slot that only its own worker would free.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::ShutDown`] if the pool has been shut down,
    /// - [`SubmitError::CapacityExceeded`] if the backlog is full under
    ///   [`RejectionPolicy::Reject`],
    /// - [`SubmitError::Spawn`] if a needed burst worker could not start.
    pub fn submit<F, T>(&self, work: F) -> Result<TaskHandle<T>, SubmitError>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = &self.shared;

        if shared.backlog.is_closed() {
            return Err(SubmitError::ShutDown);
        }

        let (task, handle) = shared.config.propagation.wrap(Box::new(work));

        let task = match shared.backlog.offer(Box::new(task)) {
            Offer::Accepted => return Ok(handle),
            Offer::Closed => return Err(SubmitError::ShutDown),
            Offer::Full(task) => task,
        };

        if shared.try_reserve_burst() {
            debug!(
                live = shared.live.load(Ordering::Acquire),
                "backlog full, spawning burst worker"
            );

            return match shared.spawn_worker(WorkerKind::Burst, Some(task)) {
                Ok(()) => Ok(handle),
                Err(err) => {
                    shared.worker_exited();
                    warn!(error = %err, "failed to spawn burst worker");
                    Err(SubmitError::Spawn(err))
                }
            };
        }

        match shared.config.rejection {
            RejectionPolicy::Block => match shared.backlog.put(task) {
                Ok(()) => Ok(handle),
                Err(_) => Err(SubmitError::ShutDown),
            },
            RejectionPolicy::Reject => {
                debug!(capacity = shared.backlog.capacity(), "rejecting task");
                Err(SubmitError::CapacityExceeded {
                    capacity: shared.backlog.capacity(),
                })
            }
        }
    }

    /// Stops accepting new tasks.
    ///
    /// Tasks already running finish normally. Queued tasks are either run
    /// ([`ShutdownPolicy::Drain`]) or cancelled
    /// ([`ShutdownPolicy::CancelPending`]). Submitters blocked on a full
    /// backlog are released with [`SubmitError::ShutDown`].
    ///
    /// Does not wait for workers; see [`join`](Self::join). Calling it more
    /// than once has no further effect.
    pub fn shutdown(&self) {
        let cancel_pending = self.shared.config.shutdown == ShutdownPolicy::CancelPending;

        let Some(pending) = self.shared.backlog.close(cancel_pending) else {
            return;
        };

        debug!(
            policy = %self.shared.config.shutdown,
            cancelled = pending.len(),
            "pool shutting down"
        );

        // Dropping unstarted tasks resolves their handles as cancelled.
        drop(pending);
    }

    /// Shuts the pool down and waits for every worker thread to exit.
    ///
    /// When called from one of the pool's own workers, that worker is not
    /// waited for. Concurrent callers all return only once the workers have
    /// left their loops.
    pub fn join(&self) {
        self.shutdown();

        let current = thread::current().id();
        let own = usize::from(is_worker_of(&self.shared));

        loop {
            let handles = mem::take(&mut *self.shared.handles.lock());

            if handles.is_empty() {
                break;
            }

            for handle in handles {
                if handle.thread().id() == current {
                    continue;
                }

                if handle.join().is_err() {
                    warn!("worker thread terminated by a panic");
                }
            }
        }

        // Another caller may hold the handles; wait on the count instead.
        let mut handles = self.shared.handles.lock();
        while self.shared.live.load(Ordering::Acquire) > own {
            self.shared.exited.wait(&mut handles);
        }
    }

    /// The propagation strategy chosen at construction.
    pub fn propagation(&self) -> Propagation {
        self.shared.config.propagation
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Number of worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.backlog.len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.shared.backlog.is_closed()
    }
}

impl Drop for ContextPool {
    /// Shuts down the pool and joins its workers.
    fn drop(&mut self) {
        self.join();
    }
}
