use std::time::Instant;

use futures::{
  executor::ThreadPool,
  future::{AbortHandle, Abortable},
};
use once_cell::sync::Lazy;

use super::{drive_task, Duration, Scheduler, Task, TaskHandle};
use crate::error::SchedulerError;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Runs tasks on a `futures` thread pool, sleeping with `futures-time`.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

/// Configures the pool behind a [`ThreadPoolScheduler`].
#[derive(Debug, Default, Clone)]
pub struct ThreadPoolSchedulerBuilder {
  pool_size: Option<usize>,
  name_prefix: Option<String>,
}

impl ThreadPoolSchedulerBuilder {
  /// Number of worker threads; defaults to the number of CPUs.
  pub fn pool_size(mut self, size: usize) -> Self {
    self.pool_size = Some(size);
    self
  }

  /// Prefix of worker thread names.
  pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.name_prefix = Some(prefix.into());
    self
  }

  pub fn build(self) -> Result<ThreadPoolScheduler, SchedulerError> {
    let mut builder = ThreadPool::builder();
    if let Some(size) = self.pool_size {
      builder.pool_size(size);
    }
    if let Some(prefix) = &self.name_prefix {
      builder.name_prefix(prefix.as_str());
    }
    let pool = builder.create().inspect_err(|err| {
      tracing::error!(%err, "failed to create scheduler thread pool");
    })?;
    tracing::debug!(pool_size = ?self.pool_size, "thread pool scheduler ready");
    Ok(ThreadPoolScheduler { pool })
  }
}

impl ThreadPoolScheduler {
  /// A scheduler over a pool with default settings.
  pub fn new() -> Result<Self, SchedulerError> { Self::builder().build() }

  pub fn builder() -> ThreadPoolSchedulerBuilder { ThreadPoolSchedulerBuilder::default() }
}

impl Scheduler for ThreadPoolScheduler {
  fn now(&self) -> Duration { EPOCH.elapsed() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let (abort, registration) = AbortHandle::new_pair();
    handle.set_abort(abort);
    let sleep = |duration: Duration| async move {
      futures_time::task::sleep(duration.into()).await;
    };
    let fut = Abortable::new(drive_task(task, handle.clone(), delay, sleep), registration);
    self.pool.spawn_ok(async move {
      let _ = fut.await;
    });
    handle
  }
}
