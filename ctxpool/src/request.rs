//! Entry point for request-handling threads.
//!
//! Routing and header parsing live outside this crate. They hand over the
//! caller's identity through an [`IdentitySource`], and [`handle_request`]
//! installs it on the request thread before any work is submitted.

use crate::context::store;
use crate::context::value::AuthContext;

/// Supplies the already-validated identity of the request being handled.
pub trait IdentitySource {
    /// Returns the principal name of the current request.
    fn current_identity(&self) -> String;
}

impl<F> IdentitySource for F
where
    F: Fn() -> String,
{
    fn current_identity(&self) -> String {
        self()
    }
}

/// Runs `f` on the calling thread on behalf of the current request.
///
/// Asks `source` for the identity once, installs it as an authenticated
/// [`AuthContext`] for the duration of `f`, and removes it afterwards, also
/// if `f` panics. Work submitted from inside `f` is submitted on behalf of
/// that identity.
///
/// # Examples
///
/// ```rust,ignore
/// let name = handle_request(&|| "Timon".to_string(), || {
///     pool.submit(|| Ok(store::current()))?.join()
/// })?;
/// ```
pub fn handle_request<S, R>(source: &S, f: impl FnOnce() -> R) -> R
where
    S: IdentitySource + ?Sized,
{
    let context = AuthContext::authenticated(source.current_identity());
    store::enter(Some(context), f)
}
