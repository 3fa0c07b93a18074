//! Worker pool components.
//!
//! This module contains the pool that executes submitted tasks on a fixed
//! set of reusable OS threads.
//!
//! It is composed of:
//! - [`core`]: the [`ContextPool`](core::ContextPool) handle, submission and
//!   lifecycle management,
//! - [`worker`]: the loop each worker thread runs,
//! - [`queue`]: the bounded backlog shared by submitters and workers,
//! - [`builder`] and [`config`]: construction parameters.
//!
//! Core workers are spawned when the pool is built and live until shutdown.
//! When the backlog is full, the pool may add burst workers up to
//! `max_threads`; those exit again after sitting idle for `keep_alive`.

pub mod builder;
pub mod config;
pub mod core;
pub(crate) mod queue;
pub(crate) mod worker;
