//! Per-thread context store.
//!
//! Every thread owns exactly one slot holding zero or one [`AuthContext`].
//! All functions here act on the calling thread's slot only; no thread ever
//! reaches into another thread's slot, so the store needs no locking.
//! Cross-thread effects happen only by the executing thread installing a
//! value in its own slot.

use super::value::AuthContext;

use std::cell::RefCell;
use std::io;
use std::thread::{self, JoinHandle};

thread_local! {
    /// Context of the unit of work currently running on this thread.
    static CURRENT_CONTEXT: RefCell<Option<AuthContext>> = const { RefCell::new(None) };
}

/// Returns a copy of the calling thread's current context, if any.
pub fn current() -> Option<AuthContext> {
    CURRENT_CONTEXT.with(|slot| slot.borrow().clone())
}

/// Installs `context` as the calling thread's current context.
pub fn set(context: AuthContext) {
    replace(Some(context));
}

/// Removes the calling thread's current context.
pub fn clear() {
    replace(None);
}

/// Swaps the calling thread's slot for `context` and returns what it held.
pub fn replace(context: Option<AuthContext>) -> Option<AuthContext> {
    CURRENT_CONTEXT.with(|slot| slot.replace(context))
}

/// Runs `f` with `context` installed on the calling thread.
///
/// The slot is set to `context` (or cleared when `None`) for the duration of
/// the closure. Afterwards, the previous value is put back. Restoration also
/// happens when `f` panics, while the stack unwinds through this frame.
///
/// # Examples
///
/// ```rust,ignore
/// store::enter(Some(AuthContext::authenticated("Joe")), || {
///     assert_eq!(store::current().unwrap().principal(), "Joe");
/// });
/// assert_eq!(store::current(), None);
/// ```
pub fn enter<R>(context: Option<AuthContext>, f: impl FnOnce() -> R) -> R {
    let _restore = RestoreGuard {
        previous: replace(context),
    };

    f()
}

/// Puts the saved context back into the slot when dropped.
struct RestoreGuard {
    previous: Option<AuthContext>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        replace(self.previous.take());
    }
}

/// Spawns a thread whose slot starts as a copy of the caller's context.
///
/// The copy is taken once, here, on the spawning thread. After that the two
/// slots are independent: changes on the parent are not seen by the child
/// and vice versa.
///
/// A long-lived pooled thread spawned this way keeps the context that was
/// current when it was created. Work handed to it later, on behalf of some
/// other request, does not receive that request's context.
pub fn spawn_inheriting<F, T>(builder: thread::Builder, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let inherited = current();

    builder.spawn(move || {
        replace(inherited);
        f()
    })
}
