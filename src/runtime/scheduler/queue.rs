//! Task queue for runners
//!
//! Multi-producer FIFO queue of runnable tasks. The lock is held only for the
//! push or pop itself, never while a task runs.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::task::Runnable;

/// A thread-safe FIFO task queue.
pub struct TaskQueue {
    inner: Mutex<VecDeque<Arc<dyn Runnable>>>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl TaskQueue {
    /// Create a new empty task queue.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Push a task to the back of the queue.
    #[inline]
    pub fn push(
        &self,
        task: Arc<dyn Runnable>,
    ) {
        self.inner.lock().push_back(task);
    }

    /// Pop a task from the front of the queue.
    #[inline]
    pub fn pop_front(&self) -> Option<Arc<dyn Runnable>> {
        self.inner.lock().pop_front()
    }

    /// Get the number of tasks in the queue.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
