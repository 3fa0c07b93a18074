/// Task is waiting in the backlog.
///
/// This is the only state from which a task may start or be cancelled.
pub(crate) const QUEUED: usize = 0;

/// Task is being executed by a worker.
///
/// At most one worker may move a task into this state.
pub(crate) const RUNNING: usize = 1;

/// Task has run and its outcome has been published.
pub(crate) const COMPLETED: usize = 2;

/// Task was cancelled before a worker picked it up.
///
/// Its unit of work never runs.
pub(crate) const CANCELLED: usize = 3;
