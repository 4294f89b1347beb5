//! Paused continuations.
//!
//! A continuation registered on a task that has not completed yet is parked
//! in the task's [`ContinuationList`] together with where it must run. The
//! list and the completion flag live under one lock: completion takes the
//! whole list in the same critical section that marks the task settled, so
//! a concurrent registration either lands in the list before the take or
//! observes the outcome and dispatches itself.

use std::sync::Arc;

use super::basic_task::BasicAsyncTask;
use super::error::AsyncResult;
use super::task::TaskId;
use super::RunnerRef;

/// Where a continuation runs once its parent completes.
#[derive(Clone)]
pub(crate) enum ContinuationTarget {
    /// The parent's runner at dispatch time (`then` family).
    Owner,
    /// An explicit runner (`then_on` family).
    Runner(RunnerRef),
}

impl ContinuationTarget {
    pub(crate) fn resolve<T>(
        &self,
        parent: &BasicAsyncTask<T>,
    ) -> RunnerRef
    where
        T: Send + Sync + 'static,
    {
        match self {
            ContinuationTarget::Owner => parent.runner(),
            ContinuationTarget::Runner(runner) => runner.clone(),
        }
    }
}

type Dispatch<T> = Box<dyn FnOnce(Arc<AsyncResult<T>>, RunnerRef) + Send>;

/// A continuation waiting for its parent.
///
/// `dispatch` installs the child's body (which needs the parent's outcome)
/// and schedules the child on the resolved runner.
pub(crate) struct PausedContinuation<T> {
    task: TaskId,
    target: ContinuationTarget,
    dispatch: Dispatch<T>,
}

impl<T> PausedContinuation<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new<D>(
        task: TaskId,
        target: ContinuationTarget,
        dispatch: D,
    ) -> Self
    where
        D: FnOnce(Arc<AsyncResult<T>>, RunnerRef) + Send + 'static,
    {
        Self {
            task,
            target,
            dispatch: Box::new(dispatch),
        }
    }

    /// Hand the continuation to its runner.
    pub(crate) fn dispatch(
        self,
        parent: &BasicAsyncTask<T>,
        outcome: Arc<AsyncResult<T>>,
    ) {
        let runner = self.target.resolve(parent);
        tracing::trace!(
            parent = %parent.id(),
            task = %self.task,
            runner = runner.name(),
            "dispatching continuation"
        );
        (self.dispatch)(outcome, runner);
    }
}

/// Outcome slot plus the continuations parked until it is filled.
pub(crate) struct ContinuationList<T> {
    outcome: Option<Arc<AsyncResult<T>>>,
    paused: Vec<PausedContinuation<T>>,
}

impl<T> ContinuationList<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: None,
            paused: Vec::new(),
        }
    }

    /// Park `record`, or hand it back with the outcome if already settled.
    pub(crate) fn buffer(
        &mut self,
        record: PausedContinuation<T>,
    ) -> Option<(PausedContinuation<T>, Arc<AsyncResult<T>>)> {
        match &self.outcome {
            Some(outcome) => Some((record, outcome.clone())),
            None => {
                self.paused.push(record);
                None
            }
        }
    }

    /// Fill the outcome and take every parked continuation, in registration
    /// order. Returns `None` if the outcome was already filled.
    pub(crate) fn settle(
        &mut self,
        outcome: Arc<AsyncResult<T>>,
    ) -> Option<Vec<PausedContinuation<T>>> {
        if self.outcome.is_some() {
            return None;
        }
        self.outcome = Some(outcome);
        Some(std::mem::take(&mut self.paused))
    }

    #[inline]
    pub(crate) fn outcome(&self) -> Option<&Arc<AsyncResult<T>>> {
        self.outcome.as_ref()
    }

    #[inline]
    pub(crate) fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    #[inline]
    pub(crate) fn paused_len(&self) -> usize {
        self.paused.len()
    }
}
