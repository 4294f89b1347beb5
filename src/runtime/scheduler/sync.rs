//! Blocking/notify primitive injected into runners.
//!
//! A cooperative runner drains on the calling thread and never needs to
//! block. Blocking only happens in [`BasicAsyncTask::wait`] when the task's
//! runner has nothing left to run and the completion has to come from
//! another thread.
//!
//! [`BasicAsyncTask::wait`]: super::BasicAsyncTask::wait

use std::fmt::Debug;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::util::config::SyncConfig;

/// Minimal blocking/notify abstraction.
pub trait Synchronization: Send + Sync + Debug {
    /// Block the calling thread until `done` returns true.
    ///
    /// `done` is re-evaluated after every notification and at least once per
    /// poll interval, so a notification that races ahead of the wait cannot
    /// leave the caller parked.
    fn block_until(
        &self,
        done: &mut dyn FnMut() -> bool,
    );

    /// Wake every thread blocked in [`block_until`](Self::block_until).
    fn notify_all(&self);
}

/// Condition-variable backed [`Synchronization`].
#[derive(Debug)]
pub struct BlockingSynchronization {
    lock: Mutex<()>,
    condvar: Condvar,
    poll_interval: Duration,
}

impl BlockingSynchronization {
    /// Create with the default poll interval.
    pub fn new() -> Self {
        Self::from_config(&SyncConfig::default())
    }

    /// Create from configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::with_poll_interval(Duration::from_millis(config.poll_interval_ms.max(1)))
    }

    /// Create with an explicit poll interval.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            lock: Mutex::new(()),
            condvar: Condvar::new(),
            poll_interval,
        }
    }

    /// The interval after which `done` is re-checked without a notification.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for BlockingSynchronization {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchronization for BlockingSynchronization {
    fn block_until(
        &self,
        done: &mut dyn FnMut() -> bool,
    ) {
        let mut guard = self.lock.lock();
        while !done() {
            self.condvar.wait_for(&mut guard, self.poll_interval);
        }
    }

    fn notify_all(&self) {
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }
}
