//! A small business service that runs on the pool and reads the context.
//!
//! The service never receives the caller's identity as a parameter. It
//! learns who it runs for only by reading the worker's context store, so
//! its answers show directly whether the pool propagated the right one.

use crate::context::store;
use crate::error::SubmitError;
use crate::pool::core::ContextPool;
use crate::request::{IdentitySource, handle_request};
use crate::task::TaskHandle;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use tracing::info;

/// Greets callers asynchronously on behalf of the current principal.
#[derive(Clone)]
pub struct PrincipalService {
    pool: Arc<ContextPool>,
    delay: Duration,
}

impl PrincipalService {
    /// Creates a service that runs its work on `pool`.
    pub fn new(pool: Arc<ContextPool>) -> Self {
        Self {
            pool,
            delay: Duration::from_millis(10),
        }
    }

    /// Sets the simulated processing time of each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Submits a call that answers with the principal found in the worker's
    /// context.
    ///
    /// `username` is only logged next to the context value, to make
    /// mismatches visible; the answer comes from the store. The task fails
    /// if the worker has no context at all.
    ///
    /// # Errors
    ///
    /// Returns the pool's [`SubmitError`] if the call was not accepted.
    pub fn hello(&self, username: &str) -> Result<TaskHandle<String>, SubmitError> {
        let username = username.to_string();
        let delay = self.delay;

        self.pool.submit(move || {
            let context = store::current().ok_or_else(|| {
                anyhow!("no principal on worker thread (called for {username})")
            })?;

            info!(
                username = %username,
                context = %context,
                thread = thread::current().name().unwrap_or("<unnamed>"),
                "hello"
            );

            thread::sleep(delay);
            Ok(context.principal().to_string())
        })
    }

    /// Serves one request end to end.
    ///
    /// Installs the identity from `source` on the calling thread, submits
    /// [`hello`](Self::hello), and waits for the answer.
    ///
    /// # Errors
    ///
    /// Fails if the call was rejected or the task did not produce an answer.
    pub fn serve<S>(&self, source: &S, username: &str) -> anyhow::Result<String>
    where
        S: IdentitySource + ?Sized,
    {
        handle_request(source, || {
            let handle = self.hello(username).context("hello was not accepted")?;
            Ok(handle.join()?)
        })
    }
}
