//! Crate-level error types.
//!
//! Stream errors travel through the `Err` type parameter of each observable and
//! are never wrapped here. The enums below cover misuse of the subscription
//! containers and failures while standing up a scheduler back-end.

use thiserror::Error;

/// Errors raised by the subscription containers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionError {
  /// A `SingleAssignmentSubscription` was given a second subscription. The
  /// rejected subscription has already been unsubscribed.
  #[error("single assignment subscription was already assigned")]
  AlreadyAssigned,
}

/// Errors raised while building a scheduler.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
  /// The thread pool backing `ThreadPoolScheduler` could not be created.
  #[error("failed to build thread pool: {0}")]
  PoolBuild(#[from] std::io::Error),

  /// `TokioScheduler::current` was called outside a tokio runtime.
  #[error("no tokio runtime is running on this thread")]
  NoRuntime,
}

impl SchedulerError {
  /// Returns a short stable label (snake_case) for use in logs.
  pub fn as_label(&self) -> &'static str {
    match self {
      SchedulerError::PoolBuild(_) => "scheduler_pool_build",
      SchedulerError::NoRuntime => "scheduler_no_runtime",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcombine_macro::test]
  fn labels_are_stable() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    assert_eq!(SchedulerError::from(io).as_label(), "scheduler_pool_build");
    assert_eq!(SchedulerError::NoRuntime.as_label(), "scheduler_no_runtime");
  }

  #[rxcombine_macro::test]
  fn display_messages() {
    assert_eq!(
      SubscriptionError::AlreadyAssigned.to_string(),
      "single assignment subscription was already assigned"
    );
    assert_eq!(SchedulerError::NoRuntime.to_string(), "no tokio runtime is running on this thread");
  }
}
