//! Execution context primitives.
//!
//! This module holds the data that describes who a unit of work runs on
//! behalf of, and the per-thread slot that makes it reachable from deep
//! inside a call stack without threading it through every call.
//!
//! It consists of:
//! - [`value`]: the immutable [`AuthContext`](value::AuthContext),
//! - [`store`]: the thread-local slot every propagation strategy builds on.

pub mod store;
pub mod value;
