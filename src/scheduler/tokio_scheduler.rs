use futures::future::{AbortHandle, Abortable};
use tokio::{runtime::Handle, time::Instant};

use super::{drive_task, Duration, Scheduler, Task, TaskHandle};
use crate::error::SchedulerError;

/// Runs tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
  handle: Handle,
  epoch: Instant,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler { handle, epoch: Instant::now() } }

  /// A scheduler over the runtime the caller is running on.
  pub fn current() -> Result<Self, SchedulerError> {
    Handle::try_current().map(Self::new).map_err(|_| SchedulerError::NoRuntime)
  }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Duration { self.epoch.elapsed() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let (abort, registration) = AbortHandle::new_pair();
    handle.set_abort(abort);
    let fut = Abortable::new(drive_task(task, handle.clone(), delay, tokio::time::sleep), registration);
    self.handle.spawn(fut);
    handle
  }
}
