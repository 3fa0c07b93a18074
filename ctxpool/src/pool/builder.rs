use super::config::{PoolConfig, RejectionPolicy, ShutdownPolicy};
use super::core::ContextPool;
use crate::error::BuildError;
use crate::propagation::Propagation;

use std::time::Duration;

/// Builder for configuring and creating a [`ContextPool`].
///
/// Starts from [`PoolConfig::default`] and lets each parameter be
/// overridden before the pool is started. Nothing is validated until
/// [`build`](Self::build).
///
/// # Examples
///
/// ```rust,ignore
/// let pool = PoolBuilder::new()
///     .core_threads(4)
///     .max_threads(8)
///     .queue_capacity(256)
///     .propagation(Propagation::CaptureAndRestore)
///     .rejection(RejectionPolicy::Block)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    config: PoolConfig,
}

impl PoolBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded with an existing configuration.
    pub fn from_config(config: PoolConfig) -> Self {
        Self { config }
    }

    /// Sets the number of workers spawned at construction.
    pub fn core_threads(mut self, n: usize) -> Self {
        self.config.core_threads = n;
        self
    }

    /// Sets the upper bound on live workers, burst workers included.
    pub fn max_threads(mut self, n: usize) -> Self {
        self.config.max_threads = n;
        self
    }

    /// Sets the maximum number of queued tasks.
    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.config.queue_capacity = n;
        self
    }

    /// Selects the propagation strategy for the pool's whole lifetime.
    pub fn propagation(mut self, propagation: Propagation) -> Self {
        self.config.propagation = propagation;
        self
    }

    /// Selects what `submit` does when the backlog is saturated.
    pub fn rejection(mut self, rejection: RejectionPolicy) -> Self {
        self.config.rejection = rejection;
        self
    }

    /// Selects what happens to queued tasks at shutdown.
    pub fn shutdown_policy(mut self, shutdown: ShutdownPolicy) -> Self {
        self.config.shutdown = shutdown;
        self
    }

    /// Sets how long an idle burst worker lingers before exiting.
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the worker thread name prefix.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Returns the configuration assembled so far.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Validates the configuration and starts the pool.
    ///
    /// All core workers are spawned before this returns.
    ///
    /// # Errors
    ///
    /// Returns a validation error from [`PoolConfig::validate`], or
    /// [`BuildError::Spawn`] if a worker thread could not be started.
    pub fn build(self) -> Result<ContextPool, BuildError> {
        ContextPool::start(self.config)
    }
}
