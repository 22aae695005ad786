//! Scheduling abstraction.
//!
//! Operators never spawn threads or read a wall clock. Every delay, period
//! and timestamp goes through a [`Scheduler`], so the same pipeline runs on a
//! thread pool, a tokio runtime or the virtual clock of [`TestScheduler`].

use std::{
  future::Future,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
  },
};

pub use std::time::Duration;

use futures::future::AbortHandle;

use crate::subscription::Subscription;

mod test_scheduler;
pub use test_scheduler::TestScheduler;

#[cfg(feature = "futures-scheduler")]
mod thread_pool_scheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool_scheduler::{ThreadPoolScheduler, ThreadPoolSchedulerBuilder};

#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

// ==================== Task ====================

/// What a task wants after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  /// Done; the scheduler drops the task.
  Finished,
  /// Run again as soon as possible.
  Yield,
  /// Run again after the given duration.
  Sleeping(Duration),
}

/// A unit of work a scheduler can run, possibly many times.
pub struct Task(Box<dyn FnMut() -> TaskState + Send>);

impl Task {
  pub fn new(step: impl FnMut() -> TaskState + Send + 'static) -> Self { Task(Box::new(step)) }

  /// A task that runs `action` once and finishes.
  pub fn once(action: impl FnOnce() + Send + 'static) -> Self {
    let mut action = Some(action);
    Task::new(move || {
      if let Some(action) = action.take() {
        action();
      }
      TaskState::Finished
    })
  }

  #[inline]
  pub fn step(&mut self) -> TaskState { (self.0)() }
}

// ==================== TaskHandle ====================

#[derive(Default)]
struct HandleState {
  cancelled: AtomicBool,
  finished: AtomicBool,
  abort: Mutex<Option<AbortHandle>>,
}

/// Cancellation handle of a scheduled task.
///
/// Unsubscribing before the task runs prevents it from running; unsubscribing
/// a periodic task stops it before its next step. A step that is already
/// running is never interrupted.
#[derive(Clone, Default)]
pub struct TaskHandle(Arc<HandleState>);

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  /// Whether the task ran to `TaskState::Finished`.
  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  pub(crate) fn mark_finished(&self) { self.0.finished.store(true, Ordering::Release); }

  pub(crate) fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  /// Attach the abort handle of the spawned future driving this task.
  pub(crate) fn set_abort(&self, abort: AbortHandle) {
    let mut slot = self.0.abort.lock().unwrap_or_else(PoisonError::into_inner);
    if self.is_cancelled() {
      abort.abort();
    } else {
      *slot = Some(abort);
    }
  }
}

impl Subscription for TaskHandle {
  fn unsubscribe(self) {
    if self.0.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    let abort = self.0.abort.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(abort) = abort {
      abort.abort();
    }
    if !self.is_finished() {
      tracing::trace!("scheduled task cancelled");
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.is_cancelled() || self.is_finished() }
}

// ==================== Scheduler ====================

/// Orders tasks in time.
///
/// Implementors provide a clock and `schedule_task`; the convenience methods
/// are expressed in terms of those two.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Current time of this scheduler's clock, measured from its own epoch.
  fn now(&self) -> Duration;

  /// Run `task` after `delay` (or as soon as possible), re-running it as long
  /// as it asks to.
  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle;

  fn schedule(&self, action: impl FnOnce() + Send + 'static) -> TaskHandle {
    self.schedule_task(Task::once(action), None)
  }

  fn schedule_after(&self, delay: Duration, action: impl FnOnce() + Send + 'static) -> TaskHandle {
    self.schedule_task(Task::once(action), Some(delay))
  }

  /// Run `action` at clock time `due`; a due time in the past runs as soon
  /// as possible.
  fn schedule_at(&self, due: Duration, action: impl FnOnce() + Send + 'static) -> TaskHandle {
    let delay = due.saturating_sub(self.now());
    self.schedule_after(delay, action)
  }

  /// Run `action` every `period`, first after one full period.
  fn schedule_periodic(
    &self, period: Duration, mut action: impl FnMut() + Send + 'static,
  ) -> TaskHandle {
    let task = Task::new(move || {
      action();
      TaskState::Sleeping(period)
    });
    self.schedule_task(task, Some(period))
  }
}

/// Drive `task` as a future on an async runtime, using `sleep` for delays.
#[allow(dead_code)]
async fn drive_task<F, Fut>(mut task: Task, handle: TaskHandle, delay: Option<Duration>, sleep: F)
where
  F: Fn(Duration) -> Fut,
  Fut: Future<Output = ()>,
{
  if let Some(delay) = delay {
    sleep(delay).await;
  }
  loop {
    if handle.is_cancelled() {
      return;
    }
    match task.step() {
      TaskState::Finished => {
        handle.mark_finished();
        return;
      }
      TaskState::Yield => sleep(Duration::ZERO).await,
      TaskState::Sleeping(duration) => sleep(duration).await,
    }
  }
}
