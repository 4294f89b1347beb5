//! Task identity and lifecycle.
//!
//! Every task handed out by a runner carries a process-unique [`TaskId`] and a
//! [`TaskState`] that only moves forward.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::RunnerRef;

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Get the inner value.
    #[inline]
    pub fn inner(&self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(val: usize) -> Self {
        Self(val)
    }
}

impl From<TaskId> for usize {
    fn from(val: TaskId) -> Self {
        val.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Task lifecycle.
///
/// `Pending -> Scheduled -> Running -> Completed`. An async continuation
/// passes through `Waiting` after its body has produced the inner task it
/// completes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but not on any runner's queue yet.
    Pending,
    /// Sitting in a runner's queue.
    Scheduled,
    /// Body is executing.
    Running,
    /// Body ran; completion is owed by an inner task.
    Waiting,
    /// Terminal.
    Completed,
}

impl TaskState {
    /// Convert from u8 (for atomic storage).
    #[inline]
    pub fn from_u8(val: u8) -> Self {
        match val {
            0 => TaskState::Pending,
            1 => TaskState::Scheduled,
            2 => TaskState::Running,
            3 => TaskState::Waiting,
            _ => TaskState::Completed,
        }
    }

    /// Convert to u8 (for atomic storage).
    #[inline]
    pub fn as_u8(&self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Scheduled => 1,
            TaskState::Running => 2,
            TaskState::Waiting => 3,
            TaskState::Completed => 4,
        }
    }
}

/// Generator for process-unique task IDs.
#[derive(Debug)]
pub struct TaskIdGenerator {
    next_id: AtomicUsize,
}

impl TaskIdGenerator {
    /// Create a new task ID generator starting at zero.
    #[inline]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(0),
        }
    }

    /// Generate the next task ID.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TaskIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static TASK_IDS: TaskIdGenerator = TaskIdGenerator::new();

/// Allocate a fresh task ID.
#[inline]
pub(crate) fn next_task_id() -> TaskId {
    TASK_IDS.next()
}

/// Object-safe view of a task, shared by every `BasicAsyncTask<T>`.
pub trait AsyncTask: Send + Sync {
    /// The task's ID.
    fn id(&self) -> TaskId;

    /// The task's name (defaults to its ID).
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> TaskState;

    /// Whether the task has completed. Once true, stays true.
    fn is_completed(&self) -> bool;

    /// Whether the task completed through its error channel.
    fn is_failed(&self) -> bool;

    /// Continuations buffered on this task until it completes.
    fn paused_task_count(&self) -> usize;

    /// The runner this task belongs to.
    fn runner(&self) -> RunnerRef;
}

/// Queue-facing side of a task: what a runner stores and executes.
pub trait Runnable: Send + Sync {
    /// The task's ID.
    fn id(&self) -> TaskId;

    /// Called by a runner when the task enters its queue.
    fn mark_scheduled(&self);

    /// Run the body and, unless completion is owed by an inner task,
    /// complete the task and dispatch its continuations.
    fn run(&self) -> RunStatus;
}

/// What happened when a runner ran a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The body returned a value.
    Completed,
    /// The body panicked or returned an error, or the parent had failed.
    Failed,
    /// The body ran; completion will come from an inner task.
    Waiting,
    /// There was no body to run (already run).
    Skipped,
}
