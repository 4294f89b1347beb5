//! Runner-based task scheduling with continuation chaining
//!
//! An [`AsyncRunner`] is one execution context: it accepts tasks, reports how
//! many are queued, and runs them when asked to drain. Scheduling a body on a
//! runner yields a [`BasicAsyncTask`] handle; continuations chained onto that
//! handle are parked until it completes and then handed to their target
//! runner.
//!
//! Runners never drain each other. A chain that hops across runners only
//! advances as far as the runners that have been drained:
//!
//! ```
//! use std::sync::Arc;
//! use chainrun::runtime::scheduler::{AsyncRunner, AsyncRunnerExt, CurrentThreadAsyncRunner, RunnerRef};
//!
//! let ui: RunnerRef = Arc::new(CurrentThreadAsyncRunner::new());
//! let worker: RunnerRef = Arc::new(CurrentThreadAsyncRunner::new());
//!
//! let load = worker.schedule(|| 7);
//! let shown = load.then_on_with(Some(&ui), Some(|v: &i32| format!("got {}", v))).unwrap();
//!
//! worker.await_all();
//! assert_eq!(ui.scheduled_task_count(), 1);
//! ui.await_all();
//! assert_eq!(shown.wait().unwrap(), "got 7");
//! ```

pub mod basic_task;
pub mod current_thread;
pub mod error;
pub mod queue;
pub mod sync;
pub mod task;

mod continuation;

pub use basic_task::{AsyncAction, AsyncFunction, BasicAsyncTask};
pub use current_thread::CurrentThreadAsyncRunner;
pub use error::{AsyncError, AsyncResult};
pub use queue::TaskQueue;
pub use sync::{BlockingSynchronization, Synchronization};
pub use task::{AsyncTask, RunStatus, Runnable, TaskId, TaskIdGenerator, TaskState};

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared handle to a runner.
pub type RunnerRef = Arc<dyn AsyncRunner>;

/// An execution context that accepts scheduled work and can be drained.
///
/// Ordering is FIFO within one runner; nothing is promised across runners.
pub trait AsyncRunner: Send + Sync + Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Enqueue `task`. Must not run it synchronously.
    fn schedule_task(
        &self,
        task: Arc<dyn Runnable>,
    );

    /// Tasks enqueued but not yet run.
    fn scheduled_task_count(&self) -> usize;

    /// Run queued work until this runner's queue is empty, including work
    /// enqueued while draining. Never drains another runner.
    fn await_all(&self);

    /// The blocking/notify primitive injected into this runner.
    fn synchronization(&self) -> &Arc<dyn Synchronization>;

    /// Counters for this runner.
    fn stats(&self) -> &RunnerStats;
}

/// Typed scheduling on a shared runner.
pub trait AsyncRunnerExt {
    /// Schedule `body`. With a unit body this yields an [`AsyncAction`].
    fn schedule<T, F>(
        &self,
        body: F,
    ) -> AsyncFunction<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static;

    /// Schedule `body` under a name that shows up in logs and `Debug`.
    fn schedule_named<T, F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> AsyncFunction<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static;

    /// Schedule a fallible `body`; an `Err` becomes the task's error.
    fn schedule_fallible<T, F>(
        &self,
        body: F,
    ) -> AsyncFunction<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static;
}

impl AsyncRunnerExt for RunnerRef {
    fn schedule<T, F>(
        &self,
        body: F,
    ) -> AsyncFunction<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        BasicAsyncTask::scheduled(self, None, move |_| Ok(body()))
    }

    fn schedule_named<T, F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> AsyncFunction<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        BasicAsyncTask::scheduled(self, Some(name.into()), move |_| Ok(body()))
    }

    fn schedule_fallible<T, F>(
        &self,
        body: F,
    ) -> AsyncFunction<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        BasicAsyncTask::scheduled(self, None, move |id| {
            body().map_err(|error| AsyncError::from_anyhow(id, error))
        })
    }
}

/// Runner counters.
#[derive(Debug, Default)]
pub struct RunnerStats {
    /// Tasks enqueued.
    pub tasks_scheduled: AtomicUsize,
    /// Tasks whose body produced a value.
    pub tasks_completed: AtomicUsize,
    /// Tasks that completed with an error.
    pub tasks_failed: AtomicUsize,
    /// Async continuations left waiting on an inner task.
    pub tasks_waiting: AtomicUsize,
    /// Calls to `await_all`.
    pub drains: AtomicUsize,
}

impl RunnerStats {
    /// Record a scheduled task.
    #[inline]
    pub fn record_scheduled(&self) {
        self.tasks_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed task.
    #[inline]
    pub fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed task.
    #[inline]
    pub fn record_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an async continuation that now waits on its inner task.
    #[inline]
    pub fn record_waiting(&self) {
        self.tasks_waiting.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a drain pass.
    #[inline]
    pub fn record_drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tasks_scheduled: self.tasks_scheduled.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_waiting: self.tasks_waiting.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`RunnerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub tasks_scheduled: usize,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub tasks_waiting: usize,
    pub drains: usize,
}

impl StatsSnapshot {
    /// Tasks that ran to an outcome, successful or not.
    #[inline]
    pub fn tasks_finished(&self) -> usize {
        self.tasks_completed + self.tasks_failed
    }
}

#[cfg(test)]
mod tests;
