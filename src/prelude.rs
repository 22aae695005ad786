//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Core traits
pub use crate::observable::{CoreObservable, Observable};
pub use crate::observer::{BoxedEmitter, BoxedObserver, Emitter, FnMutObserver, Observer, ObserverAll};
pub use crate::subscription::Subscription;
// Sources
pub use crate::observable::{
  create, empty, from_iter, interval, never, of, throw_err, timer, try_from_iter, BoxedObservable,
  Create, Empty, FromIter, Interval, Never, Of, OkSources, ThrowErr, Timer, TryFromIter,
};
// N-ary constructors
pub use crate::factory;
// Operators
pub use crate::ops::{
  amb::Amb,
  buffer::{Buffer, BufferToggle, BufferWhen},
  catch::{Catch, CatchSequence},
  combine_latest::CombineLatest,
  concat::Concat,
  map::Map,
  merge::MergeAll,
  on_error_resume_next::OnErrorResumeNext,
  skip_until::SkipUntil,
  switch_on_next::SwitchOnNext,
  take_until::TakeUntil,
  window::{Window, WindowStream, WindowToggle, WindowWhen},
  zip::{Zip, ZipIter},
};
// Subscriptions
pub use crate::subscription::{
  BoxedSubscription, ClosureSubscription, CompositeSubscription, EitherSubscription,
  SerialSubscription, SingleAssignmentSubscription, SubscriptionGuard, SubscriptionWrapper,
};
// Scheduler
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{Duration, Scheduler, Task, TaskHandle, TaskState, TestScheduler};
// Notification and errors
pub use crate::error::{SchedulerError, SubscriptionError};
pub use crate::notification::Notification;
// Virtual time harness
pub use crate::testing::*;
