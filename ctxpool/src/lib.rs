//! # ctxpool
//!
//! **ctxpool** is a worker thread pool that carries a per-request execution
//! context (an authenticated principal) from the thread that accepted a
//! request onto the pooled thread that later runs work on that request's
//! behalf.
//!
//! Naively copying thread-local state is silently wrong once worker threads
//! are reused: a worker keeps whatever the previous task left behind. The
//! pool therefore lets you pick, once at construction, how context reaches a
//! worker:
//!
//! - [`Propagation::None`]: nothing is carried; workers see stale state
//!   left by earlier tasks,
//! - [`Propagation::InheritAtSpawn`]: a worker copies its creator's context
//!   when the OS thread is spawned, and never again,
//! - [`Propagation::CaptureAndRestore`]: the submitter's context is
//!   snapshotted at [`ContextPool::submit`] and installed around the unit of
//!   work, then the worker's previous context is restored.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ctxpool::{AuthContext, ContextPool, Propagation, store};
//!
//! let pool = ContextPool::builder()
//!     .core_threads(4)
//!     .propagation(Propagation::CaptureAndRestore)
//!     .build()?;
//!
//! let handle = store::enter(Some(AuthContext::authenticated("Joe")), || {
//!     pool.submit(|| Ok(store::current()))
//! })?;
//!
//! assert_eq!(handle.join()?, Some(AuthContext::authenticated("Joe")));
//! ```
//!
//! ## Modules
//!
//! - [`context`]: the context value and the per-thread store
//! - [`propagation`]: the three propagation strategies
//! - [`pool`]: the worker pool, its builder and configuration
//! - [`task`]: task handles returned by [`ContextPool::submit`]
//! - [`request`]: entry point for request-handling threads
//! - [`service`]: a small business service that reads the context

pub mod context;
pub mod error;
pub mod pool;
pub mod propagation;
pub mod request;
pub mod service;
pub mod task;

pub use context::store;
pub use context::value::AuthContext;
pub use error::{BuildError, ParseEnumError, SubmitError, TaskError};
pub use pool::builder::PoolBuilder;
pub use pool::config::{PoolConfig, RejectionPolicy, ShutdownPolicy};
pub use pool::core::ContextPool;
pub use pool::worker::worker_id;
pub use propagation::Propagation;
pub use request::{IdentitySource, handle_request};
pub use service::PrincipalService;
pub use task::TaskHandle;
