//! Merge operator implementation
//!
//! Flattens an observable of observables by subscribing to every inner
//! observable as it arrives and interleaving their values. With a
//! concurrency bound, inners that arrive while the bound is reached wait in
//! arrival order and are admitted as running ones complete.
//!
//! The stream completes once the outer observable and every admitted inner
//! have completed. Any error ends it at once.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::Terminal,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{CompositeSubscription, SingleAssignmentSubscription, Subscription},
};

/// Flattens `source`, running at most `max_concurrent` inners at once.
#[derive(Clone)]
pub struct MergeAll<S> {
  source: S,
  max_concurrent: usize,
}

impl<S> MergeAll<S> {
  /// A bound of zero is treated as one.
  pub fn new(source: S, max_concurrent: usize) -> Self {
    MergeAll { source, max_concurrent: max_concurrent.max(1) }
  }
}

struct MergeState<Inner, O> {
  observer: Option<O>,
  active: usize,
  queue: VecDeque<Inner>,
  outer_done: bool,
}

struct Merger<Inner, O> {
  gate: MutArc<MergeState<Inner, O>>,
  group: CompositeSubscription,
  max_concurrent: usize,
  /// Slots freed but not yet handed to a queued inner or given back.
  freed: Arc<AtomicUsize>,
}

impl<Inner, O> Clone for Merger<Inner, O> {
  fn clone(&self) -> Self {
    Merger {
      gate: self.gate.clone(),
      group: self.group.clone(),
      max_concurrent: self.max_concurrent,
      freed: self.freed.clone(),
    }
  }
}

impl<Inner, O> Merger<Inner, O>
where
  Inner: CoreObservable,
  O: Observer<Inner::Item, Inner::Err> + Send + 'static,
  Inner: Send + 'static,
{
  fn subscribe_inner(&self, inner: Inner) {
    let slot = SingleAssignmentSubscription::new();
    let Some(id) = self.group.add(slot.clone()) else {
      return;
    };
    let observer = MergeInnerObserver { merger: self.clone(), id };
    slot.assign(inner.actual_subscribe(observer));
  }

  fn finish(&self, terminal: Terminal<Inner::Err>) {
    let observer = self.gate.rc_deref_mut().observer.take();
    terminal.deliver(observer);
    self.group.clone().unsubscribe();
  }

  /// Admit the next queued inner into a freed slot, or complete if nothing
  /// is left to run.
  ///
  /// Only the first caller drains; an inner that completes while being
  /// admitted leaves its slot to the running loop.
  fn release_slot(&self) {
    if self.freed.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      let (next, done) = {
        let mut state = self.gate.rc_deref_mut();
        match state.queue.pop_front() {
          Some(next) => (Some(next), false),
          None => {
            state.active -= 1;
            (None, state.active == 0 && state.outer_done)
          }
        }
      };
      if let Some(next) = next {
        tracing::debug!("merge admitting a queued inner observable");
        self.subscribe_inner(next);
      } else if done {
        self.finish(Terminal::Complete);
      }
      if self.freed.fetch_sub(1, Ordering::AcqRel) == 1 {
        break;
      }
    }
  }

  fn is_closed(&self) -> bool {
    self.group.is_closed() || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

/// Observer of the outer observable.
pub struct MergeOuterObserver<Inner, O> {
  merger: Merger<Inner, O>,
  slot: SingleAssignmentSubscription,
}

/// Observer of one admitted inner observable.
pub struct MergeInnerObserver<Inner, O> {
  merger: Merger<Inner, O>,
  id: usize,
}

impl<Inner, O> Observer<Inner, Inner::Err> for MergeOuterObserver<Inner, O>
where
  Inner: CoreObservable + Send + 'static,
  O: Observer<Inner::Item, Inner::Err> + Send + 'static,
{
  fn next(&mut self, inner: Inner) {
    if self.merger.group.is_closed() {
      return;
    }
    let admitted = {
      let mut state = self.merger.gate.rc_deref_mut();
      if state.observer.is_none() {
        return;
      }
      if state.active < self.merger.max_concurrent {
        state.active += 1;
        Some(inner)
      } else {
        state.queue.push_back(inner);
        tracing::trace!(queued = state.queue.len(), "merge concurrency bound reached");
        None
      }
    };
    if let Some(inner) = admitted {
      self.merger.subscribe_inner(inner);
    }
  }

  fn error(self, err: Inner::Err) { self.merger.finish(Terminal::Error(err)); }

  fn complete(self) {
    let done = {
      let mut state = self.merger.gate.rc_deref_mut();
      state.outer_done = true;
      state.active == 0
    };
    if done {
      self.merger.finish(Terminal::Complete);
    } else {
      self.slot.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.merger.is_closed() }
}

impl<Inner, O> Observer<Inner::Item, Inner::Err> for MergeInnerObserver<Inner, O>
where
  Inner: CoreObservable + Send + 'static,
  O: Observer<Inner::Item, Inner::Err> + Send + 'static,
{
  fn next(&mut self, value: Inner::Item) {
    if self.merger.group.is_closed() {
      return;
    }
    if let Some(observer) = self.merger.gate.rc_deref_mut().observer.as_mut() {
      observer.next(value);
    }
  }

  fn error(self, err: Inner::Err) { self.merger.finish(Terminal::Error(err)); }

  fn complete(self) {
    self.merger.group.remove(self.id);
    self.merger.release_slot();
  }

  fn is_closed(&self) -> bool { self.merger.is_closed() }
}

impl<S> CoreObservable for MergeAll<S>
where
  S: CoreObservable,
  S::Item: CoreObservable<Err = S::Err> + Send + 'static,
{
  type Item = <S::Item as CoreObservable>::Item;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let group = CompositeSubscription::new();
    let merger = Merger {
      gate: MutArc::own(MergeState {
        observer: Some(observer),
        active: 0,
        queue: VecDeque::new(),
        outer_done: false,
      }),
      group: group.clone(),
      max_concurrent: self.max_concurrent,
      freed: Arc::new(AtomicUsize::new(0)),
    };
    let slot = SingleAssignmentSubscription::new();
    group.add(slot.clone());
    let outer = MergeOuterObserver { merger, slot: slot.clone() };
    slot.assign(self.source.actual_subscribe(outer));
    group
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn interleaves_and_completes_last() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 1),
      on_next(230, 3),
      on_completed(260),
    ]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(220, 2),
      on_next(240, 4),
      on_completed(250),
    ]);
    let (a, b) = (o1.clone(), o2.clone());
    let results = scheduler.start(move || a.merge(b));
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(220, 2), on_next(230, 3), on_next(240, 4), on_completed(260)]
    );
    assert_eq!(o1.subscriptions(), vec![subscribed(200, 260)]);
    assert_eq!(o2.subscriptions(), vec![subscribed(200, 250)]);
  }

  #[rxcombine_macro::test]
  fn inner_error_disposes_everything() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 1), on_next(240, 3)]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![on_error(220, "boom")]);
    let recorded = o1.clone();
    let results = scheduler.start(move || factory::merge([o1, o2]));
    assert_eq!(results.messages(), vec![on_next(210, 1), on_error(220, "boom")]);
    assert_eq!(recorded.subscriptions(), vec![subscribed(200, 220)]);
  }

  #[rxcombine_macro::test]
  fn waits_for_outer_completion() {
    let scheduler = TestScheduler::new();
    let ys1 = scheduler.create_cold_observable::<i32, &str>(vec![on_next(5, 1), on_completed(10)]);
    let ys2 = scheduler.create_cold_observable::<i32, &str>(vec![on_next(5, 2), on_completed(10)]);
    let xs = scheduler.create_hot_observable::<ColdObservable<i32, &str>, &str>(vec![
      on_next(210, ys1),
      on_next(230, ys2),
      on_completed(300),
    ]);
    let results = scheduler.start(move || xs.merge_all(usize::MAX));
    assert_eq!(results.messages(), vec![on_next(215, 1), on_next(235, 2), on_completed(300)]);
  }

  #[rxcombine_macro::test]
  fn concurrency_bound_queues_in_order() {
    let scheduler = TestScheduler::new();
    let ys1 = scheduler.create_cold_observable::<i32, &str>(vec![
      on_next(10, 1),
      on_next(30, 2),
      on_completed(40),
    ]);
    let ys2 = scheduler.create_cold_observable::<i32, &str>(vec![on_next(5, 10), on_completed(6)]);
    let ys3 = scheduler.create_cold_observable::<i32, &str>(vec![on_next(5, 100), on_completed(6)]);
    let xs = scheduler.create_hot_observable::<ColdObservable<i32, &str>, &str>(vec![
      on_next(210, ys1),
      on_next(215, ys2.clone()),
      on_next(220, ys3.clone()),
      on_completed(225),
    ]);
    let results = scheduler.start(move || xs.concat_all());
    assert_eq!(
      results.messages(),
      vec![
        on_next(220, 1),
        on_next(240, 2),
        on_next(255, 10),
        on_next(261, 100),
        on_completed(262)
      ]
    );
    assert_eq!(ys2.subscriptions(), vec![subscribed(250, 256)]);
    assert_eq!(ys3.subscriptions(), vec![subscribed(256, 262)]);
  }

  #[rxcombine_macro::test]
  fn synchronous_sources_merge_in_subscription_order() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    factory::merge_with_concurrency(
      vec![from_iter::<_, ()>(vec![1, 2]), from_iter(vec![3]), from_iter(vec![4, 5])],
      2,
    )
    .subscribe_all(move |v| s.lock().unwrap().push(v), |_| {}, || {});
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
  }

  #[rxcombine_macro::test]
  fn concat_all_drains_a_long_synchronous_backlog() {
    let scheduler = TestScheduler::new();
    let first = scheduler.create_cold_observable::<usize, &str>(vec![on_next(5, 0), on_completed(10)]);
    let results = scheduler.start(move || {
      let backlog = (1..=100_000).map(|v| of(v).box_it());
      from_iter::<_, &str>(std::iter::once(first.box_it()).chain(backlog)).concat_all()
    });

    let messages = results.messages();
    assert_eq!(messages.len(), 100_002);
    assert_eq!(messages[0], on_next(205, 0));
    assert_eq!(messages[100_000], on_next(210, 100_000));
    assert_eq!(messages.last(), Some(&on_completed(210)));
  }
}
