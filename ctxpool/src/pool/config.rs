use crate::error::{BuildError, ParseEnumError};
use crate::propagation::Propagation;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What [`submit`](crate::ContextPool::submit) does when the backlog is full
/// and no burst worker can be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionPolicy {
    /// Wait until a worker frees a backlog slot or the pool shuts down.
    Block,

    /// Fail immediately with
    /// [`SubmitError::CapacityExceeded`](crate::SubmitError::CapacityExceeded).
    #[default]
    Reject,
}

impl RejectionPolicy {
    /// Returns the configuration name of the policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Reject => "reject",
        }
    }
}

/// What happens to tasks still queued when the pool shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutdownPolicy {
    /// Workers run every queued task before exiting.
    #[default]
    Drain,

    /// Queued tasks are discarded; their handles resolve to
    /// [`TaskError::Cancelled`](crate::TaskError::Cancelled).
    CancelPending,
}

impl ShutdownPolicy {
    /// Returns the configuration name of the policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drain => "drain",
            Self::CancelPending => "cancel-pending",
        }
    }
}

impl fmt::Display for RejectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ShutdownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RejectionPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Block, Self::Reject]
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("rejection policy", s))
    }
}

impl FromStr for ShutdownPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Drain, Self::CancelPending]
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("shutdown policy", s))
    }
}

/// Construction parameters of a [`ContextPool`](crate::ContextPool).
///
/// Every field has a default, so a partial JSON document only overrides
/// what it names:
///
/// ```rust,ignore
/// let config = PoolConfig::from_json(r#"{ "core_threads": 4, "rejection": "block" }"#)?;
/// assert_eq!(config.max_threads, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers spawned at construction and kept until shutdown.
    pub core_threads: usize,
    /// Upper bound on live workers, burst workers included.
    pub max_threads: usize,
    /// Maximum number of tasks waiting for a worker.
    pub queue_capacity: usize,
    /// How the submitter's context reaches the worker.
    pub propagation: Propagation,
    /// Behaviour of `submit` when the backlog is saturated.
    pub rejection: RejectionPolicy,
    /// Fate of queued tasks at shutdown.
    pub shutdown: ShutdownPolicy,
    /// Idle time after which a burst worker exits, in milliseconds.
    pub keep_alive_ms: u64,
    /// Prefix of worker thread names; a 1-based sequence number follows.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_threads: 10,
            max_threads: 20,
            queue_capacity: 10,
            propagation: Propagation::default(),
            rejection: RejectionPolicy::default(),
            shutdown: ShutdownPolicy::default(),
            keep_alive_ms: 60_000,
            thread_name_prefix: "Thread-".to_string(),
        }
    }
}

impl PoolConfig {
    /// Parses a configuration from JSON, filling unnamed fields with
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or unknown enum
    /// names. The result is not validated; see [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks the thread and queue bounds.
    ///
    /// # Errors
    ///
    /// - [`BuildError::ZeroCoreThreads`] if `core_threads == 0`,
    /// - [`BuildError::MaxBelowCore`] if `max_threads < core_threads`,
    /// - [`BuildError::ZeroQueueCapacity`] if `queue_capacity == 0`.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.core_threads == 0 {
            return Err(BuildError::ZeroCoreThreads);
        }

        if self.max_threads < self.core_threads {
            return Err(BuildError::MaxBelowCore {
                core: self.core_threads,
                max: self.max_threads,
            });
        }

        if self.queue_capacity == 0 {
            return Err(BuildError::ZeroQueueCapacity);
        }

        Ok(())
    }

    /// Idle time after which a burst worker exits.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }
}
