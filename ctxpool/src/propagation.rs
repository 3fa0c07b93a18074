//! Context propagation strategies.
//!
//! A [`Propagation`] decides how the context set on a submitting thread
//! becomes visible to the unit of work once it runs on a pool worker. The
//! strategy is chosen once, when the pool is built, and never changes for
//! that pool.
//!
//! Each variant has two halves:
//! - a submission half ([`Propagation::capture`]) that runs synchronously on
//!   the submitting thread before the task is queued,
//! - an execution half ([`Propagation::run_with`]) that runs on the worker
//!   around the unit of work.
//!
//! A third hook, used only when worker threads are created, lets
//! [`Propagation::InheritAtSpawn`] copy the spawning thread's context.

use crate::context::store;
use crate::context::value::AuthContext;
use crate::error::ParseEnumError;
use crate::task::{Task, TaskHandle, Work};

use std::fmt;
use std::io;
use std::str::FromStr;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

/// How a submitter's context reaches the worker that runs its task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Propagation {
    /// Nothing is carried.
    ///
    /// Code on the worker sees whatever the worker's slot already holds,
    /// typically a value left behind by an earlier, unrelated task that
    /// set it and never cleaned up. Under thread reuse this leaks one
    /// request's identity into another's work.
    None,

    /// Worker threads copy their creator's context when they are spawned.
    ///
    /// The copy happens once per OS thread. Core workers are spawned when
    /// the pool is built, so they carry whatever was current on the
    /// building thread at that moment (usually nothing) for their whole
    /// life. Burst workers are spawned from a submitting thread and keep
    /// that submitter's context forever, handing it to later tasks from
    /// other submitters.
    ///
    /// This is only correct when every task gets a freshly spawned thread.
    /// With a reusing pool, tasks generally do not see their submitter's
    /// context. The pool accepts this configuration anyway.
    InheritAtSpawn,

    /// The submitter's context is snapshotted at submission and installed
    /// on the worker around the unit of work.
    ///
    /// The worker's previous context is restored afterwards, also when the
    /// unit of work fails or panics, before the worker picks up its next
    /// task. Correct under arbitrary thread reuse and concurrent
    /// submitters.
    #[default]
    CaptureAndRestore,
}

impl Propagation {
    /// All strategies, in declaration order.
    pub const ALL: [Propagation; 3] = [
        Propagation::None,
        Propagation::InheritAtSpawn,
        Propagation::CaptureAndRestore,
    ];

    /// Reads the context to carry with a task being submitted.
    ///
    /// Must be called on the submitting thread. Only
    /// [`CaptureAndRestore`](Self::CaptureAndRestore) looks at the store;
    /// the other strategies carry nothing.
    pub fn capture(self) -> Option<AuthContext> {
        match self {
            Self::CaptureAndRestore => store::current(),
            Self::None | Self::InheritAtSpawn => None,
        }
    }

    /// Wraps `work` into a task carrying `captured`.
    pub(crate) fn propagate<T: Send + 'static>(
        self,
        captured: Option<AuthContext>,
        work: Work<T>,
    ) -> (Task<T>, TaskHandle<T>) {
        Task::new(work, captured, self)
    }

    /// Captures the calling thread's context and wraps `work` with it.
    pub(crate) fn wrap<T: Send + 'static>(self, work: Work<T>) -> (Task<T>, TaskHandle<T>) {
        self.propagate(self.capture(), work)
    }

    /// Runs `f` on the current (worker) thread with this strategy applied.
    ///
    /// For [`CaptureAndRestore`](Self::CaptureAndRestore), `captured` is
    /// installed (or the slot cleared when `None`) and the previous value
    /// is put back afterwards, even if `f` panics. The other strategies
    /// run `f` untouched.
    pub fn run_with<R>(self, captured: Option<AuthContext>, f: impl FnOnce() -> R) -> R {
        match self {
            Self::CaptureAndRestore => store::enter(captured, f),
            Self::None | Self::InheritAtSpawn => f(),
        }
    }

    /// Spawns a pool worker thread.
    ///
    /// [`InheritAtSpawn`](Self::InheritAtSpawn) seeds the new thread's slot
    /// with the calling thread's context; the others start it empty.
    pub(crate) fn spawn_worker<F>(self, builder: thread::Builder, f: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Self::InheritAtSpawn => store::spawn_inheriting(builder, f),
            Self::None | Self::CaptureAndRestore => builder.spawn(f),
        }
    }

    /// Returns the configuration name of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::InheritAtSpawn => "inherit-at-spawn",
            Self::CaptureAndRestore => "capture-and-restore",
        }
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Propagation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("propagation", s))
    }
}
