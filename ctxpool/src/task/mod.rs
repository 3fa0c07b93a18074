//! Submitted units of work.
//!
//! This module defines how a closure handed to
//! [`ContextPool::submit`](crate::ContextPool::submit) is wrapped, tracked
//! and observed.
//!
//! It includes:
//! - task state management,
//! - the wrapper that applies the pool's propagation around execution,
//! - [`TaskHandle`], the future-like handle used to await the outcome.

pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod state;

pub(crate) use self::core::{Runnable, Task, Work};

pub use handle::TaskHandle;
