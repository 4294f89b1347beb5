//! Cooperative runner that drains on whichever thread calls `await_all`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::queue::TaskQueue;
use super::sync::{BlockingSynchronization, Synchronization};
use super::task::{RunStatus, Runnable};
use super::{AsyncRunner, RunnerRef, RunnerStats};
use crate::util::config::RuntimeConfig;

static RUNNER_IDS: AtomicUsize = AtomicUsize::new(0);

/// Single FIFO queue drained synchronously by `await_all`.
///
/// Scheduling never runs anything. The bodies run on the thread that calls
/// [`await_all`](AsyncRunner::await_all), which is how work is marshaled
/// onto a thread that owns some resource: schedule from anywhere, drain from
/// the owning thread.
#[derive(Debug)]
pub struct CurrentThreadAsyncRunner {
    name: String,
    queue: TaskQueue,
    synchronization: Arc<dyn Synchronization>,
    stats: RunnerStats,
}

impl CurrentThreadAsyncRunner {
    /// Create a runner with a default [`BlockingSynchronization`].
    pub fn new() -> Self {
        Self::with_synchronization(Arc::new(BlockingSynchronization::new()))
    }

    /// Create a runner around an injected synchronization primitive.
    pub fn with_synchronization(synchronization: Arc<dyn Synchronization>) -> Self {
        let id = RUNNER_IDS.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("current-thread-{}", id),
            queue: TaskQueue::new(),
            synchronization,
            stats: RunnerStats::default(),
        }
    }

    /// Create a runner from configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let runner =
            Self::with_synchronization(Arc::new(BlockingSynchronization::from_config(&config.sync)));
        match &config.runner.name {
            Some(name) => runner.named(name.clone()),
            None => runner,
        }
    }

    /// Replace the generated name.
    pub fn named(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self
    }

    /// Move into a shared [`RunnerRef`].
    pub fn shared(self) -> RunnerRef {
        Arc::new(self)
    }
}

impl Default for CurrentThreadAsyncRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRunner for CurrentThreadAsyncRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn schedule_task(
        &self,
        task: Arc<dyn Runnable>,
    ) {
        task.mark_scheduled();
        self.queue.push(task);
        self.stats.record_scheduled();
        // a thread parked in `wait()` on this runner may now have work to drain
        self.synchronization.notify_all();
    }

    fn scheduled_task_count(&self) -> usize {
        self.queue.len()
    }

    fn await_all(&self) {
        debug!(runner = %self.name, queued = self.queue.len(), "draining runner");

        let mut ran = 0usize;
        // Pop until the live queue is empty: bodies may enqueue more work here.
        while let Some(task) = self.queue.pop_front() {
            match task.run() {
                RunStatus::Completed => self.stats.record_completed(),
                RunStatus::Failed => self.stats.record_failed(),
                RunStatus::Waiting => self.stats.record_waiting(),
                RunStatus::Skipped => {}
            }
            ran += 1;
        }

        self.stats.record_drain();
        debug!(runner = %self.name, ran, "runner drained");
        self.synchronization.notify_all();
    }

    fn synchronization(&self) -> &Arc<dyn Synchronization> {
        &self.synchronization
    }

    fn stats(&self) -> &RunnerStats {
        &self.stats
    }
}
