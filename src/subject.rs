//! Multicast core.
//!
//! `Subject` fans one stream of notifications out to many observers. Window
//! hands each open window to its consumers through one, and the hot
//! observables of the `testing` harness broadcast their script through one.
//!
//! Broadcasting copies the observer list under the list lock and delivers
//! after releasing it, so an observer may unsubscribe (or subscribe another
//! observer) from inside its own callback.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex, PoisonError,
};

use smallvec::SmallVec;

use crate::{
  notification::Notification,
  observable::CoreObservable,
  observer::{BoxedObserver, Observer},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{DynamicSubscriptions, Subscription},
};

struct Entry<Item, Err> {
  closed: AtomicBool,
  observer: Mutex<Option<BoxedObserver<Item, Err>>>,
}

impl<Item, Err> Entry<Item, Err> {
  fn take(&self) -> Option<BoxedObserver<Item, Err>> {
    self.closed.store(true, Ordering::Release);
    self.observer.lock().unwrap_or_else(PoisonError::into_inner).take()
  }
}

struct Subscribers<Item, Err> {
  entries: DynamicSubscriptions<Arc<Entry<Item, Err>>>,
  terminal: Option<Notification<(), Err>>,
  replay_terminal: bool,
}

pub(crate) struct Subject<Item, Err>(MutArc<Subscribers<Item, Err>>);

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject(self.0.clone()) }
}

impl<Item, Err> Subject<Item, Err> {
  /// A subject that replays its terminal notification to late subscribers.
  pub(crate) fn new() -> Self { Self::with_replay(true) }

  /// A subject whose late subscribers see nothing once it has terminated.
  pub(crate) fn hot() -> Self { Self::with_replay(false) }

  fn with_replay(replay_terminal: bool) -> Self {
    Subject(MutArc::own(Subscribers {
      entries: DynamicSubscriptions::new(),
      terminal: None,
      replay_terminal,
    }))
  }

  fn snapshot(&self) -> SmallVec<[Arc<Entry<Item, Err>>; 2]> {
    self.0.rc_deref().entries.iter().cloned().collect()
  }

  /// Mark the subject terminated and take every observer out of it.
  fn finish(
    &self, terminal: Notification<(), Err>,
  ) -> SmallVec<[Arc<Entry<Item, Err>>; 2]> {
    let mut subscribers = self.0.rc_deref_mut();
    if subscribers.terminal.is_some() {
      return SmallVec::new();
    }
    subscribers.terminal = Some(terminal);
    subscribers.entries.take_all()
  }

  #[cfg(test)]
  pub(crate) fn observer_count(&self) -> usize { self.0.rc_deref().entries.len() }

  pub(crate) fn next(&self, value: Item)
  where
    Item: Clone,
  {
    let entries = self.snapshot();
    let mut iter = entries.iter().peekable();
    while let Some(entry) = iter.next() {
      if entry.closed.load(Ordering::Acquire) {
        continue;
      }
      let mut guard = entry.observer.lock().unwrap_or_else(PoisonError::into_inner);
      if let Some(observer) = guard.as_mut() {
        if iter.peek().is_some() {
          observer.next(value.clone());
        } else {
          observer.next(value);
          break;
        }
      }
    }
  }

  pub(crate) fn error(&self, err: Err)
  where
    Err: Clone,
  {
    for entry in self.finish(Notification::Error(err.clone())) {
      if let Some(observer) = entry.take() {
        observer.error(err.clone());
      }
    }
  }

  pub(crate) fn complete(&self) {
    for entry in self.finish(Notification::Completed) {
      if let Some(observer) = entry.take() {
        observer.complete();
      }
    }
  }

  pub(crate) fn subscribe<O>(&self, observer: O) -> SubjectSubscription<Item, Err>
  where
    O: Observer<Item, Err> + Send + 'static,
    Err: Clone,
  {
    let mut subscribers = self.0.rc_deref_mut();
    if let Some(terminal) = &subscribers.terminal {
      let replay = subscribers.replay_terminal.then(|| terminal.clone());
      drop(subscribers);
      match replay {
        Some(Notification::Error(err)) => observer.error(err),
        Some(Notification::Completed) => observer.complete(),
        _ => {}
      }
      return SubjectSubscription { subject: None, id: 0, entry: None };
    }
    let entry = Arc::new(Entry {
      closed: AtomicBool::new(false),
      observer: Mutex::new(Some(Box::new(observer) as BoxedObserver<Item, Err>)),
    });
    let id = subscribers.entries.add(entry.clone());
    SubjectSubscription { subject: Some(self.clone()), id, entry: Some(entry) }
  }
}

/// Subscription to a `Subject`.
///
/// Unsubscribing marks the entry closed and removes it from the list; it
/// never waits for a delivery in progress to the same observer.
pub struct SubjectSubscription<Item, Err> {
  subject: Option<Subject<Item, Err>>,
  id: usize,
  entry: Option<Arc<Entry<Item, Err>>>,
}

impl<Item, Err> Subscription for SubjectSubscription<Item, Err> {
  fn unsubscribe(self) {
    if let Some(entry) = &self.entry {
      entry.closed.store(true, Ordering::Release);
    }
    if let Some(subject) = self.subject {
      let removed = subject.0.rc_deref_mut().entries.remove(self.id);
      drop(removed);
    }
  }

  fn is_closed(&self) -> bool {
    self.entry.as_ref().is_none_or(|entry| entry.closed.load(Ordering::Acquire))
  }
}

impl<Item, Err> CoreObservable for Subject<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.subscribe(observer)
  }
}
