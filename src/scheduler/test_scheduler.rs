//! Test Scheduler for deterministic testing of time-based operators.
//!
//! Provides virtual time that only advances when explicitly instructed,
//! enabling deterministic testing of `timer`, `interval`,
//! `buffer_with_time`, and every marble scenario of the `testing` module.
//!
//! # Usage
//!
//! ```rust
//! use rxcombine::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! scheduler.schedule_after(Duration::from_millis(100), || println!("fired"));
//!
//! // Advance virtual time to trigger the action
//! scheduler.advance_by(Duration::from_millis(100));
//!
//! // Or execute all pending tasks
//! scheduler.flush();
//! ```
//!
//! # Sharing
//!
//! Clones share one clock and one queue. Tasks may be scheduled from any
//! thread, but they only run on the thread that advances the clock, and
//! always outside the internal lock so they may schedule more work.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{Duration, Scheduler, Task, TaskHandle, TaskState};

// ==================== Internal State ====================

#[derive(Default)]
struct TestSchedulerState {
  virtual_time: Duration,
  task_queue: BinaryHeap<ScheduledTask>,
  next_task_id: usize,
}

struct ScheduledTask {
  scheduled_time: Duration,
  task_id: usize,
  task: Task,
  handle: TaskHandle,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.scheduled_time == other.scheduled_time && self.task_id == other.task_id
  }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other
      .scheduled_time
      .cmp(&self.scheduled_time)
      .then_with(|| other.task_id.cmp(&self.task_id))
  }
}

impl TestSchedulerState {
  fn push(&mut self, scheduled_time: Duration, task: Task, handle: TaskHandle) {
    let task_id = self.next_task_id;
    self.next_task_id += 1;
    self.task_queue.push(ScheduledTask { scheduled_time, task_id, task, handle });
  }
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
///
/// One tick of the marble harness is one millisecond of virtual time.
#[derive(Clone, Default)]
pub struct TestScheduler(Arc<Mutex<TestSchedulerState>>);

impl TestScheduler {
  /// A scheduler with its clock at zero and an empty queue.
  pub fn new() -> Self { Self::default() }

  fn state(&self) -> MutexGuard<'_, TestSchedulerState> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Virtual time in ticks (milliseconds).
  pub fn clock(&self) -> u64 { self.now().as_millis() as u64 }

  /// Get the number of pending tasks in the queue.
  pub fn pending_count(&self) -> usize { self.state().task_queue.len() }

  /// Check if there are no pending tasks.
  pub fn is_empty(&self) -> bool { self.state().task_queue.is_empty() }

  fn execute_tasks_until(&self, target_time: Option<Duration>) {
    loop {
      let next = {
        let mut state = self.state();
        let should_stop = state
          .task_queue
          .peek()
          .is_none_or(|peek| target_time.is_some_and(|limit| peek.scheduled_time > limit));
        if should_stop {
          return;
        }
        let next = state.task_queue.pop();
        if let Some(task) = &next {
          if task.scheduled_time > state.virtual_time {
            state.virtual_time = task.scheduled_time;
          }
        }
        next
      };

      let Some(mut scheduled_task) = next else {
        return;
      };
      if scheduled_task.handle.is_cancelled() {
        continue;
      }

      match scheduled_task.task.step() {
        TaskState::Finished => scheduled_task.handle.mark_finished(),
        TaskState::Yield => self.reschedule(scheduled_task, Duration::ZERO),
        TaskState::Sleeping(duration) => self.reschedule(scheduled_task, duration),
      }
    }
  }

  fn reschedule(&self, scheduled_task: ScheduledTask, delay: Duration) {
    let mut state = self.state();
    let due = state.virtual_time + delay;
    state.push(due, scheduled_task.task, scheduled_task.handle);
  }

  /// Advance virtual time by the specified duration and execute due tasks.
  ///
  /// Tasks are executed in order of their scheduled time, with FIFO ordering
  /// for tasks scheduled at the same time.
  pub fn advance_by(&self, duration: Duration) {
    let target = self.now() + duration;
    self.advance_to(target);
  }

  /// Run every task due at or before `time`, then set the clock to `time`.
  /// A `time` in the past runs only the tasks already due.
  pub fn advance_to(&self, time: Duration) {
    self.execute_tasks_until(Some(time));
    let mut state = self.state();
    if time > state.virtual_time {
      state.virtual_time = time;
    }
  }

  /// Execute all pending tasks by advancing time to each task's scheduled time.
  ///
  /// Tasks that reschedule themselves will continue to be executed until they
  /// return `TaskState::Finished` or are cancelled.
  pub fn flush(&self) { self.execute_tasks_until(None); }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Duration { self.state().virtual_time }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut state = self.state();
    let due = state.virtual_time + delay.unwrap_or(Duration::ZERO);
    state.push(due, task, handle.clone());
    handle
  }
}
