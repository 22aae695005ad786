//! Virtual-time test harness.
//!
//! Scripts of timestamped notifications are replayed by hot and cold test
//! observables on a [`TestScheduler`]; a [`TestObserver`] records what reaches
//! it together with the virtual time of arrival. One tick is one millisecond
//! of scheduler time.
//!
//! ```rust
//! use rxcombine::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let xs = scheduler.create_hot_observable::<i32, ()>(vec![
//!   on_next(210, 2),
//!   on_next(220, 3),
//!   on_next(230, 4),
//! ]);
//! let ys = scheduler.create_hot_observable::<i32, ()>(vec![on_next(225, 99)]);
//!
//! let results = scheduler.start(move || xs.take_until(ys));
//! assert_eq!(
//!   results.messages(),
//!   vec![on_next(210, 2), on_next(220, 3), on_completed(225)]
//! );
//! ```

use std::sync::Arc;

use crate::{
  notification::Notification,
  observable::CoreObservable,
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{Duration, Scheduler, TaskHandle, TestScheduler},
  subject::{Subject, SubjectSubscription},
  subscription::Subscription,
};

/// Time the pipeline factory runs in [`TestScheduler::start`].
pub const CREATED: u64 = 100;
/// Time [`TestScheduler::start`] subscribes.
pub const SUBSCRIBED: u64 = 200;
/// Time [`TestScheduler::start`] unsubscribes.
pub const DISPOSED: u64 = 1000;

#[inline]
fn ticks(time: u64) -> Duration { Duration::from_millis(time) }

/// A value stamped with the virtual time it was produced at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
  pub time: u64,
  pub value: T,
}

/// A recorded notification.
pub type Message<Item, Err> = Recorded<Notification<Item, Err>>;

pub fn on_next<Item, Err>(time: u64, value: Item) -> Message<Item, Err> {
  Recorded { time, value: Notification::Next(value) }
}

pub fn on_error<Item, Err>(time: u64, err: Err) -> Message<Item, Err> {
  Recorded { time, value: Notification::Error(err) }
}

pub fn on_completed<Item, Err>(time: u64) -> Message<Item, Err> {
  Recorded { time, value: Notification::Completed }
}

/// Interval during which a test observable had a subscriber.
///
/// `unsubscribe` is `None` while the subscription is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribe: u64,
  pub unsubscribe: Option<u64>,
}

/// A subscription that was released at `unsubscribe`.
pub fn subscribed(subscribe: u64, unsubscribe: u64) -> SubscriptionLog {
  SubscriptionLog { subscribe, unsubscribe: Some(unsubscribe) }
}

/// A subscription that is still live.
pub fn subscribed_forever(subscribe: u64) -> SubscriptionLog {
  SubscriptionLog { subscribe, unsubscribe: None }
}

#[derive(Clone, Default)]
struct SubscriptionLogs(MutArc<Vec<SubscriptionLog>>);

impl SubscriptionLogs {
  fn open(&self, time: u64) -> usize {
    let mut logs = self.0.rc_deref_mut();
    logs.push(subscribed_forever(time));
    logs.len() - 1
  }

  fn close(&self, index: usize, time: u64) {
    if let Some(log) = self.0.rc_deref_mut().get_mut(index) {
      log.unsubscribe.get_or_insert(time);
    }
  }

  fn snapshot(&self) -> Vec<SubscriptionLog> { self.0.rc_deref().clone() }
}

// ==================== HotObservable ====================

/// Plays its script on the scheduler timeline from the moment it is created,
/// whether or not anyone is subscribed.
pub struct HotObservable<Item, Err> {
  subject: Subject<Item, Err>,
  scheduler: TestScheduler,
  logs: SubscriptionLogs,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self {
    HotObservable {
      subject: self.subject.clone(),
      scheduler: self.scheduler.clone(),
      logs: self.logs.clone(),
    }
  }
}

impl<Item, Err> HotObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.logs.snapshot() }
}

/// Subscription to a test observable that records when it was released.
pub struct LoggedSubscription<U> {
  inner: U,
  logs: SubscriptionLogs,
  index: usize,
  scheduler: TestScheduler,
}

impl<U: Subscription> Subscription for LoggedSubscription<U> {
  fn unsubscribe(self) {
    self.logs.close(self.index, self.scheduler.clock());
    self.inner.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.inner.is_closed() }
}

impl<Item, Err> CoreObservable for HotObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = LoggedSubscription<SubjectSubscription<Item, Err>>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let index = self.logs.open(self.scheduler.clock());
    let inner = self.subject.subscribe(observer);
    LoggedSubscription { inner, logs: self.logs, index, scheduler: self.scheduler }
  }
}

// ==================== ColdObservable ====================

/// Plays its script relative to each subscription's start time.
pub struct ColdObservable<Item, Err> {
  messages: Arc<Vec<Message<Item, Err>>>,
  scheduler: TestScheduler,
  logs: SubscriptionLogs,
}

impl<Item, Err> Clone for ColdObservable<Item, Err> {
  fn clone(&self) -> Self {
    ColdObservable {
      messages: self.messages.clone(),
      scheduler: self.scheduler.clone(),
      logs: self.logs.clone(),
    }
  }
}

impl<Item, Err> ColdObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.logs.snapshot() }
}

/// Scheduled script of one cold subscription.
pub struct ColdTasks(Vec<TaskHandle>);

impl Subscription for ColdTasks {
  fn unsubscribe(self) {
    for task in self.0 {
      task.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.iter().all(Subscription::is_closed) }
}

impl<Item, Err> CoreObservable for ColdObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = LoggedSubscription<ColdTasks>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let index = self.logs.open(self.scheduler.clock());
    let observer = MutArc::own(Some(observer));
    let tasks = self
      .messages
      .iter()
      .map(|message| {
        let observer = observer.clone();
        let notification = message.value.clone();
        self.scheduler.schedule_after(ticks(message.time), move || {
          notification.accept(observer);
        })
      })
      .collect();
    LoggedSubscription { inner: ColdTasks(tasks), logs: self.logs, index, scheduler: self.scheduler }
  }
}

// ==================== TestObserver ====================

/// Records every notification with the virtual time it arrived at.
pub struct TestObserver<Item, Err> {
  messages: MutArc<Vec<Message<Item, Err>>>,
  scheduler: TestScheduler,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    TestObserver { messages: self.messages.clone(), scheduler: self.scheduler.clone() }
  }
}

impl<Item: Clone, Err: Clone> TestObserver<Item, Err> {
  pub fn messages(&self) -> Vec<Message<Item, Err>> { self.messages.rc_deref().clone() }
}

impl<Item, Err> TestObserver<Item, Err> {
  fn record(&self, value: Notification<Item, Err>) {
    let time = self.scheduler.clock();
    self.messages.rc_deref_mut().push(Recorded { time, value });
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.record(Notification::Next(value)); }

  fn error(self, err: Err) { self.record(Notification::Error(err)); }

  fn complete(self) { self.record(Notification::Completed); }

  fn is_closed(&self) -> bool { false }
}

// ==================== Scheduler entry points ====================

impl TestScheduler {
  pub fn create_hot_observable<Item, Err>(
    &self, messages: Vec<Message<Item, Err>>,
  ) -> HotObservable<Item, Err>
  where
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    let subject = Subject::hot();
    for message in messages {
      let subject = subject.clone();
      self.schedule_at(ticks(message.time), move || match message.value {
        Notification::Next(v) => subject.next(v),
        Notification::Error(e) => subject.error(e),
        Notification::Completed => subject.complete(),
      });
    }
    HotObservable { subject, scheduler: self.clone(), logs: SubscriptionLogs::default() }
  }

  pub fn create_cold_observable<Item, Err>(
    &self, messages: Vec<Message<Item, Err>>,
  ) -> ColdObservable<Item, Err> {
    ColdObservable {
      messages: Arc::new(messages),
      scheduler: self.clone(),
      logs: SubscriptionLogs::default(),
    }
  }

  pub fn create_observer<Item, Err>(&self) -> TestObserver<Item, Err> {
    TestObserver { messages: MutArc::own(Vec::new()), scheduler: self.clone() }
  }

  /// Build the pipeline at 100, subscribe at 200, unsubscribe at 1000.
  pub fn start<S, F>(&self, create: F) -> TestObserver<S::Item, S::Err>
  where
    F: FnOnce() -> S + Send + 'static,
    S: CoreObservable + Send + 'static,
    S::Item: Send + 'static,
    S::Err: Send + 'static,
  {
    self.start_with(CREATED, SUBSCRIBED, DISPOSED, create)
  }

  /// Build the pipeline at `created`, subscribe at `subscribed`, unsubscribe
  /// at `disposed`, then run the clock up to `disposed`.
  pub fn start_with<S, F>(
    &self, created: u64, subscribed: u64, disposed: u64, create: F,
  ) -> TestObserver<S::Item, S::Err>
  where
    F: FnOnce() -> S + Send + 'static,
    S: CoreObservable + Send + 'static,
    S::Item: Send + 'static,
    S::Err: Send + 'static,
  {
    let observer = self.create_observer();
    let source: MutArc<Option<S>> = MutArc::own(None);
    let subscription: MutArc<Option<S::Unsub>> = MutArc::own(None);

    let slot = source.clone();
    self.schedule_at(ticks(created), move || *slot.rc_deref_mut() = Some(create()));

    let (slot, unsub, downstream) = (source, subscription.clone(), observer.clone());
    self.schedule_at(ticks(subscribed), move || {
      let source = slot.rc_deref_mut().take();
      if let Some(source) = source {
        let handle = source.actual_subscribe(downstream);
        *unsub.rc_deref_mut() = Some(handle);
      }
    });

    self.schedule_at(ticks(disposed), move || {
      let handle = subscription.rc_deref_mut().take();
      handle.unsubscribe();
    });

    self.advance_to(ticks(disposed));
    observer
  }
}
