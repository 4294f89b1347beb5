//! The task handle shared by every runner.
//!
//! A [`BasicAsyncTask<T>`] is a cheap, cloneable handle to one unit of
//! deferred work bound to a runner. `AsyncAction` and `AsyncFunction<T>` are
//! the same type with `T = ()` and `T = value` respectively.
//!
//! # Chaining
//!
//! The `then*` operators take their callable (and, for `then_on*`, their
//! runner) as `Option` and return `Option`: a missing argument yields `None`
//! and leaves every paused and scheduled count untouched. Call sites can
//! compose optional continuations without checking each one first. This is
//! the one place where absent input is not treated as a caller bug.
//!
//! ```
//! use std::sync::Arc;
//! use chainrun::runtime::scheduler::{AsyncRunner, AsyncRunnerExt, CurrentThreadAsyncRunner, RunnerRef};
//!
//! let runner: RunnerRef = Arc::new(CurrentThreadAsyncRunner::new());
//! let task = runner.schedule(|| 20);
//! let doubled = task.then_with(Some(|v: &i32| v * 2)).unwrap();
//!
//! runner.await_all();
//! assert_eq!(doubled.wait(), Ok(40));
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{trace, warn};

use super::continuation::{ContinuationList, ContinuationTarget, PausedContinuation};
use super::error::{AsyncError, AsyncResult};
use super::task::{next_task_id, AsyncTask, RunStatus, Runnable, TaskId, TaskState};
use super::RunnerRef;

/// Handle to a task that produces no value.
pub type AsyncAction = BasicAsyncTask<()>;

/// Handle to a task that produces a `T`.
pub type AsyncFunction<T> = BasicAsyncTask<T>;

type ImmediateBody<T> = Box<dyn FnOnce() -> AsyncResult<T> + Send>;
type DeferredBody<T> = Box<dyn FnOnce(&BasicAsyncTask<T>) -> AsyncResult<()> + Send>;

/// What a runner executes for a task.
enum TaskBody<T> {
    /// Produces the outcome directly.
    Immediate(ImmediateBody<T>),
    /// Attaches the task to an inner task that will complete it.
    Deferred(DeferredBody<T>),
}

struct TaskCore<T> {
    id: TaskId,
    name: String,
    runner: RwLock<RunnerRef>,
    state: AtomicU8,
    body: Mutex<Option<TaskBody<T>>>,
    continuations: Mutex<ContinuationList<T>>,
}

/// A unit of deferred work bound to one runner.
pub struct BasicAsyncTask<T> {
    core: Arc<TaskCore<T>>,
}

impl<T> Clone for BasicAsyncTask<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BasicAsyncTask<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let list = self.core.continuations.lock();
        f.debug_struct("BasicAsyncTask")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("runner", &self.core.runner.read().name())
            .field("state", &TaskState::from_u8(self.core.state.load(Ordering::SeqCst)))
            .field("paused", &list.paused_len())
            .finish()
    }
}

impl<T> BasicAsyncTask<T>
where
    T: Send + Sync + 'static,
{
    /// A task with no body, not on any queue.
    pub(crate) fn unscheduled(
        runner: RunnerRef,
        name: Option<String>,
    ) -> Self {
        let id = next_task_id();
        Self {
            core: Arc::new(TaskCore {
                id,
                name: name.unwrap_or_else(|| id.to_string()),
                runner: RwLock::new(runner),
                state: AtomicU8::new(TaskState::Pending.as_u8()),
                body: Mutex::new(None),
                continuations: Mutex::new(ContinuationList::new()),
            }),
        }
    }

    /// Create a task running `body` and put it on `runner`'s queue.
    pub(crate) fn scheduled<F>(
        runner: &RunnerRef,
        name: Option<String>,
        body: F,
    ) -> Self
    where
        F: FnOnce(TaskId) -> AsyncResult<T> + Send + 'static,
    {
        let task = Self::unscheduled(runner.clone(), name);
        let id = task.id();
        task.install(TaskBody::Immediate(Box::new(move || body(id))));
        task.schedule_on(runner.clone());
        task
    }

    /// The task's ID.
    #[inline]
    pub fn id(&self) -> TaskId {
        self.core.id
    }

    /// The task's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.core.state.load(Ordering::SeqCst))
    }

    /// The runner this task belongs to.
    #[inline]
    pub fn runner(&self) -> RunnerRef {
        self.core.runner.read().clone()
    }

    /// Whether the task has completed.
    pub fn is_completed(&self) -> bool {
        self.core.continuations.lock().is_settled()
    }

    /// Whether the task completed through its error channel.
    pub fn is_failed(&self) -> bool {
        self.core
            .continuations
            .lock()
            .outcome()
            .is_some_and(|outcome| outcome.is_err())
    }

    /// Number of continuations parked on this task.
    pub fn paused_task_count(&self) -> usize {
        self.core.continuations.lock().paused_len()
    }

    /// Non-blocking look at the outcome.
    pub fn result(&self) -> Option<AsyncResult<T>>
    where
        T: Clone,
    {
        self.outcome().map(|outcome| outcome.as_ref().clone())
    }

    /// Block until the task completes and return its outcome.
    ///
    /// While the task is incomplete the owning runner is drained if it has
    /// queued work; otherwise the caller parks on the runner's
    /// synchronization primitive until the task completes or new work
    /// arrives. Other runners are never drained: if the completion depends on
    /// a runner nobody drains, this blocks forever.
    pub fn wait(&self) -> AsyncResult<T>
    where
        T: Clone,
    {
        loop {
            if let Some(outcome) = self.outcome() {
                return outcome.as_ref().clone();
            }

            let runner = self.runner();
            if runner.scheduled_task_count() > 0 {
                runner.await_all();
                continue;
            }

            runner.synchronization().block_until(&mut || {
                self.is_completed() || runner.scheduled_task_count() > 0
            });
        }
    }

    /// Run `action` after this task, on this task's runner.
    pub fn then<U, F>(
        &self,
        action: Option<F>,
    ) -> Option<AsyncFunction<U>>
    where
        U: Send + Sync + 'static,
        F: FnOnce() -> U + Send + 'static,
    {
        let action = action?;
        Some(self.chain(ContinuationTarget::Owner, move |outcome| {
            outcome.as_ref().map_err(Clone::clone)?;
            Ok(action())
        }))
    }

    /// Run `action` after this task, on `runner`.
    pub fn then_on<U, F>(
        &self,
        runner: Option<&RunnerRef>,
        action: Option<F>,
    ) -> Option<AsyncFunction<U>>
    where
        U: Send + Sync + 'static,
        F: FnOnce() -> U + Send + 'static,
    {
        let runner = runner?;
        let action = action?;
        Some(self.chain(ContinuationTarget::Runner(runner.clone()), move |outcome| {
            outcome.as_ref().map_err(Clone::clone)?;
            Ok(action())
        }))
    }

    /// Run `function` with this task's value, on this task's runner.
    pub fn then_with<U, F>(
        &self,
        function: Option<F>,
    ) -> Option<AsyncFunction<U>>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let function = function?;
        Some(self.chain(ContinuationTarget::Owner, move |outcome| {
            let value = outcome.as_ref().map_err(Clone::clone)?;
            Ok(function(value))
        }))
    }

    /// Run `function` with this task's value, on `runner`.
    pub fn then_on_with<U, F>(
        &self,
        runner: Option<&RunnerRef>,
        function: Option<F>,
    ) -> Option<AsyncFunction<U>>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let runner = runner?;
        let function = function?;
        Some(self.chain(ContinuationTarget::Runner(runner.clone()), move |outcome| {
            let value = outcome.as_ref().map_err(Clone::clone)?;
            Ok(function(value))
        }))
    }

    /// After this task, call `function` on this task's runner; the returned
    /// action completes when the action produced by `function` completes.
    pub fn then_async_action<F>(
        &self,
        function: Option<F>,
    ) -> Option<AsyncAction>
    where
        F: FnOnce() -> AsyncAction + Send + 'static,
    {
        self.then_async_function(function)
    }

    /// After this task, call `function` on this task's runner; the returned
    /// task completes with the outcome of the task produced by `function`.
    pub fn then_async_function<U, F>(
        &self,
        function: Option<F>,
    ) -> Option<AsyncFunction<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce() -> AsyncFunction<U> + Send + 'static,
    {
        let function = function?;
        Some(self.chain_async(ContinuationTarget::Owner, function))
    }

    /// Like [`then_async_action`](Self::then_async_action), but `function`
    /// runs on `runner`.
    pub fn then_on_async_action<F>(
        &self,
        runner: Option<&RunnerRef>,
        function: Option<F>,
    ) -> Option<AsyncAction>
    where
        F: FnOnce() -> AsyncAction + Send + 'static,
    {
        self.then_on_async_function(runner, function)
    }

    /// Like [`then_async_function`](Self::then_async_function), but
    /// `function` runs on `runner`.
    pub fn then_on_async_function<U, F>(
        &self,
        runner: Option<&RunnerRef>,
        function: Option<F>,
    ) -> Option<AsyncFunction<U>>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce() -> AsyncFunction<U> + Send + 'static,
    {
        let runner = runner?;
        let function = function?;
        Some(self.chain_async(ContinuationTarget::Runner(runner.clone()), function))
    }

    fn outcome(&self) -> Option<Arc<AsyncResult<T>>> {
        self.core.continuations.lock().outcome().cloned()
    }

    fn set_state(
        &self,
        state: TaskState,
    ) {
        self.core.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn install(
        &self,
        body: TaskBody<T>,
    ) {
        *self.core.body.lock() = Some(body);
    }

    fn rebind_runner(
        &self,
        runner: RunnerRef,
    ) {
        *self.core.runner.write() = runner;
    }

    /// Bind to `runner` and enqueue there.
    fn schedule_on(
        &self,
        runner: RunnerRef,
    ) {
        self.rebind_runner(runner.clone());
        trace!(task = %self.core.id, runner = runner.name(), "scheduling task");
        runner.schedule_task(Arc::new(self.clone()));
    }

    /// Create a continuation whose body maps this task's outcome.
    fn chain<U, B>(
        &self,
        target: ContinuationTarget,
        body: B,
    ) -> BasicAsyncTask<U>
    where
        U: Send + Sync + 'static,
        B: FnOnce(&AsyncResult<T>) -> AsyncResult<U> + Send + 'static,
    {
        let child = BasicAsyncTask::<U>::unscheduled(target.resolve(self), None);
        let handle = child.clone();
        self.register(PausedContinuation::new(
            child.id(),
            target,
            move |outcome: Arc<AsyncResult<T>>, runner: RunnerRef| {
                handle.install(TaskBody::Immediate(Box::new(move || body(outcome.as_ref()))));
                handle.schedule_on(runner);
            },
        ));
        child
    }

    /// Create a continuation that calls `function` and then completes
    /// through the task it returns.
    fn chain_async<U, F>(
        &self,
        target: ContinuationTarget,
        function: F,
    ) -> BasicAsyncTask<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce() -> BasicAsyncTask<U> + Send + 'static,
    {
        let child = BasicAsyncTask::<U>::unscheduled(target.resolve(self), None);
        let handle = child.clone();
        self.register(PausedContinuation::new(
            child.id(),
            target,
            move |outcome: Arc<AsyncResult<T>>, runner: RunnerRef| {
                handle.install(TaskBody::Deferred(Box::new(move |outer: &BasicAsyncTask<U>| {
                    if let Err(error) = outcome.as_ref() {
                        return Err(error.clone());
                    }
                    let inner = function();
                    outer.complete_through(&inner);
                    Ok(())
                })));
                handle.schedule_on(runner);
            },
        ));
        child
    }

    /// Park `record` on this task, or dispatch it now if already completed.
    fn register(
        &self,
        record: PausedContinuation<T>,
    ) {
        let ready = self.core.continuations.lock().buffer(record);
        match ready {
            Some((record, outcome)) => record.dispatch(self, outcome),
            None => trace!(task = %self.core.id, "continuation paused"),
        }
    }

    /// Complete this task with `inner`'s outcome once `inner` completes.
    ///
    /// From here on this task is driven by `inner`'s runner, so its own
    /// default-target continuations run there too.
    fn complete_through(
        &self,
        inner: &BasicAsyncTask<T>,
    ) where
        T: Clone,
    {
        self.rebind_runner(inner.runner());
        let outer = self.clone();
        let forward = inner.chain::<(), _>(ContinuationTarget::Owner, move |outcome| {
            outer.complete(outcome.clone());
            Ok(())
        });
        trace!(
            task = %self.core.id,
            inner = %inner.id(),
            forward = %forward.id(),
            "waiting on inner task"
        );
    }

    /// Completion dispatch. Returns false if the task had already completed.
    fn complete(
        &self,
        outcome: AsyncResult<T>,
    ) -> bool {
        let outcome = Arc::new(outcome);
        let paused = {
            let mut list = self.core.continuations.lock();
            match list.settle(outcome.clone()) {
                Some(paused) => {
                    self.set_state(TaskState::Completed);
                    paused
                }
                None => return false,
            }
        };

        if let Err(error) = outcome.as_ref() {
            warn!(task = %self.core.id, name = %self.core.name, %error, "task failed");
        }
        trace!(
            task = %self.core.id,
            continuations = paused.len(),
            "task completed"
        );

        for record in paused {
            record.dispatch(self, outcome.clone());
        }
        self.runner().synchronization().notify_all();
        true
    }
}

impl<T> AsyncTask for BasicAsyncTask<T>
where
    T: Send + Sync + 'static,
{
    fn id(&self) -> TaskId {
        BasicAsyncTask::id(self)
    }

    fn name(&self) -> &str {
        BasicAsyncTask::name(self)
    }

    fn state(&self) -> TaskState {
        BasicAsyncTask::state(self)
    }

    fn is_completed(&self) -> bool {
        BasicAsyncTask::is_completed(self)
    }

    fn is_failed(&self) -> bool {
        BasicAsyncTask::is_failed(self)
    }

    fn paused_task_count(&self) -> usize {
        BasicAsyncTask::paused_task_count(self)
    }

    fn runner(&self) -> RunnerRef {
        BasicAsyncTask::runner(self)
    }
}

impl<T> Runnable for BasicAsyncTask<T>
where
    T: Send + Sync + 'static,
{
    fn id(&self) -> TaskId {
        self.core.id
    }

    fn mark_scheduled(&self) {
        let _ = self.core.state.compare_exchange(
            TaskState::Pending.as_u8(),
            TaskState::Scheduled.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn run(&self) -> RunStatus {
        let Some(body) = self.core.body.lock().take() else {
            return RunStatus::Skipped;
        };
        self.set_state(TaskState::Running);

        let id = self.core.id;
        match body {
            TaskBody::Immediate(body) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(body))
                    .unwrap_or_else(|payload| Err(AsyncError::from_panic(id, payload)));
                let status = if outcome.is_ok() {
                    RunStatus::Completed
                } else {
                    RunStatus::Failed
                };
                self.complete(outcome);
                status
            }
            TaskBody::Deferred(body) => {
                let attached = panic::catch_unwind(AssertUnwindSafe(|| body(self)))
                    .unwrap_or_else(|payload| Err(AsyncError::from_panic(id, payload)));
                match attached {
                    Ok(()) => {
                        let _ = self.core.state.compare_exchange(
                            TaskState::Running.as_u8(),
                            TaskState::Waiting.as_u8(),
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        );
                        RunStatus::Waiting
                    }
                    Err(error) => {
                        self.complete(Err(error));
                        RunStatus::Failed
                    }
                }
            }
        }
    }
}
