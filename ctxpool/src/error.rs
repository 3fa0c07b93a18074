//! Error types returned by the pool.
//!
//! Three separate enums, one per failure site:
//! - [`BuildError`]: the pool could not be constructed,
//! - [`SubmitError`]: a unit of work was not accepted,
//! - [`TaskError`]: an accepted unit of work did not produce a value.

use std::io;

/// Errors raised while validating configuration or starting workers.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("core_threads must be greater than zero")]
    ZeroCoreThreads,

    #[error("max_threads ({max}) must be at least core_threads ({core})")]
    MaxBelowCore { core: usize, max: usize },

    #[error("queue_capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Errors returned by [`ContextPool::submit`](crate::ContextPool::submit).
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The backlog is full, no burst worker can be added, and the pool
    /// rejects instead of blocking.
    #[error("backlog is full ({capacity} tasks queued) and all workers are busy")]
    CapacityExceeded { capacity: usize },

    /// The pool no longer accepts work.
    #[error("pool is shut down")]
    ShutDown,

    /// A burst worker was needed but the OS refused to start it.
    #[error("failed to spawn burst worker: {0}")]
    Spawn(#[from] io::Error),
}

/// Why a submitted task did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The unit of work returned an error.
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),

    /// The unit of work panicked. The worker thread survives.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task never started: it was cancelled through its handle, or
    /// discarded by a cancelling shutdown.
    #[error("task was cancelled before it started")]
    Cancelled,
}

impl TaskError {
    /// Returns `true` if the task was cancelled before it ran.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// A configuration name did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
