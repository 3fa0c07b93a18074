use crate::task::Runnable;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Result of a non-blocking [`Backlog::offer`].
pub(crate) enum Offer {
    /// The task was queued.
    Accepted,

    /// The backlog is at capacity; the task is handed back.
    Full(Box<dyn Runnable>),

    /// The backlog no longer accepts work; the task is dropped.
    Closed,
}

/// Result of a worker's [`Backlog::take`].
pub(crate) enum Take {
    /// A task to run.
    Task(Box<dyn Runnable>),

    /// Nothing arrived within the idle timeout.
    Idle,

    /// The backlog is closed and empty.
    Closed,
}

/// Bounded task queue shared by submitters and workers.
///
/// Submitters push at the back and workers take from the front. The only
/// lock in the pool's hot path guards this queue.
///
/// Tasks cancelled while queued do not count against the capacity; they
/// are pruned the next time a submitter needs room.
///
/// Two condition variables coordinate waiting:
/// - `available` wakes workers parked on an empty queue,
/// - `space` wakes submitters blocked on a full queue.
///
/// Closing wakes both, so nobody stays parked after shutdown.
pub(crate) struct Backlog {
    state: Mutex<BacklogState>,
    available: Condvar,
    space: Condvar,
    capacity: usize,
}

struct BacklogState {
    tasks: VecDeque<Box<dyn Runnable>>,
    closed: bool,
}

impl BacklogState {
    /// Drops finished entries, then reports whether the queue is at
    /// `capacity`.
    fn has_no_room(&mut self, capacity: usize) -> bool {
        if self.tasks.len() < capacity {
            return false;
        }

        self.tasks.retain(|task| !task.is_finished());
        self.tasks.len() >= capacity
    }
}

impl Backlog {
    /// Creates an empty backlog holding at most `capacity` tasks.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BacklogState {
                tasks: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            space: Condvar::new(),
            capacity,
        }
    }

    /// Queues `task` if there is room, without waiting.
    pub(crate) fn offer(&self, task: Box<dyn Runnable>) -> Offer {
        let mut state = self.state.lock();

        if state.closed {
            return Offer::Closed;
        }

        if state.has_no_room(self.capacity) {
            return Offer::Full(task);
        }

        state.tasks.push_back(task);
        drop(state);

        self.available.notify_one();
        Offer::Accepted
    }

    /// Queues `task`, waiting for room if the backlog is full.
    ///
    /// Hands the task back if the backlog is closed before room appears.
    ///
    /// Only workers taking tasks or a shutdown wake a waiting caller; a
    /// slot freed by cancellation is picked up on the next wakeup.
    pub(crate) fn put(&self, task: Box<dyn Runnable>) -> Result<(), Box<dyn Runnable>> {
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(task);
            }

            if !state.has_no_room(self.capacity) {
                state.tasks.push_back(task);
                drop(state);

                self.available.notify_one();
                return Ok(());
            }

            self.space.wait(&mut state);
        }
    }

    /// Takes the oldest queued task, parking while the backlog is empty.
    ///
    /// Queued tasks are still handed out after the backlog is closed, so
    /// workers drain whatever was left. With `idle_timeout`, gives up
    /// after that long without work.
    pub(crate) fn take(&self, idle_timeout: Option<Duration>) -> Take {
        // A timeout too large for a deadline means waiting without limit.
        let deadline = idle_timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.state.lock();
        let mut timed_out = false;

        loop {
            if let Some(task) = state.tasks.pop_front() {
                drop(state);

                self.space.notify_one();
                return Take::Task(task);
            }

            if state.closed {
                return Take::Closed;
            }

            if timed_out {
                return Take::Idle;
            }

            match deadline {
                Some(deadline) => {
                    timed_out = self.available.wait_until(&mut state, deadline).timed_out();
                }
                None => self.available.wait(&mut state),
            }
        }
    }

    /// Stops accepting tasks and wakes every parked thread.
    ///
    /// With `cancel_pending`, the queued tasks are removed and returned so
    /// the caller can drop them outside the lock. Returns `None` if the
    /// backlog was already closed.
    pub(crate) fn close(&self, cancel_pending: bool) -> Option<Vec<Box<dyn Runnable>>> {
        let mut state = self.state.lock();

        if state.closed {
            return None;
        }

        state.closed = true;

        let pending = if cancel_pending {
            state.tasks.drain(..).collect()
        } else {
            Vec::new()
        };
        drop(state);

        self.available.notify_all();
        self.space.notify_all();

        Some(pending)
    }

    /// Number of tasks waiting for a worker, not counting cancelled ones.
    pub(crate) fn len(&self) -> usize {
        let state = self.state.lock();
        state.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Maximum number of queued tasks.
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}
