//! Zip operator implementation
//!
//! Pairs values by position: the n-th output combines the n-th value of
//! every source, no matter when each one arrived. Unpaired values wait in a
//! queue per source.
//!
//! The stream completes as soon as some source has completed with an empty
//! queue, since nothing it could contribute is left. Values still buffered
//! in other queues are dropped.

use std::collections::VecDeque;

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::{SourceSlots, Terminal},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{CompositeSubscription, SingleAssignmentSubscription, Subscription},
};

/// Zips `sources` with `selector`.
#[derive(Clone)]
pub struct Zip<S, F> {
  pub sources: Vec<S>,
  pub selector: F,
}

struct ZipState<T, F, O> {
  observer: Option<O>,
  queues: Vec<VecDeque<T>>,
  done: Vec<bool>,
  selector: F,
}

impl<T, F, O> ZipState<T, F, O> {
  fn row_ready(&self) -> bool { self.queues.iter().all(|queue| !queue.is_empty()) }

  fn exhausted(&self) -> bool {
    self.queues.iter().zip(&self.done).any(|(queue, done)| *done && queue.is_empty())
  }

  fn pop_row(&mut self) -> Vec<T> {
    self.queues.iter_mut().filter_map(VecDeque::pop_front).collect()
  }
}

/// Observer of source `index`.
pub struct ZipObserver<T, F, O> {
  index: usize,
  gate: MutArc<ZipState<T, F, O>>,
  slots: SourceSlots,
}

impl<T, F, O> ZipObserver<T, F, O> {
  /// Deliver `terminal` to the observer already taken out of the gate.
  fn finish<R, Err>(&self, observer: Option<O>, terminal: Terminal<Err>)
  where
    O: Observer<R, Err>,
  {
    terminal.deliver(observer);
    self.slots.release_all();
  }
}

impl<T, R, Err, F, O> Observer<T, Err> for ZipObserver<T, F, O>
where
  F: FnMut(Vec<T>) -> Result<R, Err>,
  O: Observer<R, Err>,
{
  fn next(&mut self, value: T) {
    if self.slots.is_closed(self.index) {
      return;
    }
    let (observer, terminal) = {
      let mut guard = self.gate.rc_deref_mut();
      let state = &mut *guard;
      if state.observer.is_none() {
        return;
      }
      state.queues[self.index].push_back(value);
      if !state.row_ready() {
        return;
      }
      let row = state.pop_row();
      let terminal = match (state.selector)(row) {
        Ok(zipped) => {
          if let Some(observer) = state.observer.as_mut() {
            observer.next(zipped);
          }
          if !state.exhausted() {
            return;
          }
          Terminal::Complete
        }
        Err(err) => Terminal::Error(err),
      };
      (state.observer.take(), terminal)
    };
    self.finish(observer, terminal);
  }

  fn error(self, err: Err) {
    let observer = self.gate.rc_deref_mut().observer.take();
    self.finish(observer, Terminal::Error(err));
  }

  fn complete(self) {
    let observer = {
      let mut state = self.gate.rc_deref_mut();
      state.done[self.index] = true;
      if !state.exhausted() {
        None
      } else {
        Some(state.observer.take())
      }
    };
    match observer {
      Some(observer) => self.finish(observer, Terminal::Complete),
      None => self.slots.release(self.index),
    }
  }

  fn is_closed(&self) -> bool {
    self.slots.is_closed(self.index)
      || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

impl<S, R, F> CoreObservable for Zip<S, F>
where
  S: CoreObservable,
  S::Item: Send + 'static,
  F: FnMut(Vec<S::Item>) -> Result<R, S::Err> + Send + 'static,
{
  type Item = R;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<R, S::Err> + Send + 'static,
  {
    let len = self.sources.len();
    let slots = SourceSlots::new(len);
    if len == 0 {
      observer.complete();
      return slots.group();
    }
    let gate = MutArc::own(ZipState {
      observer: Some(observer),
      queues: (0..len).map(|_| VecDeque::new()).collect(),
      done: vec![false; len],
      selector: self.selector,
    });
    for (index, source) in self.sources.into_iter().enumerate() {
      if slots.is_group_closed() {
        break;
      }
      let observer = ZipObserver { index, gate: gate.clone(), slots: slots.clone() };
      slots.assign(index, source.actual_subscribe(observer));
    }
    slots.group()
  }
}

// ==================== ZipIter ====================

/// Pairs each value of `source` with the next element pulled from `iter`.
///
/// An `Err` element fails the stream; an exhausted iterator completes it.
#[derive(Clone)]
pub struct ZipIter<S, I, F> {
  pub source: S,
  pub iter: I,
  pub selector: F,
}

/// Observer pulling one element of the iterator per value.
pub struct ZipIterObserver<O, I, F> {
  observer: Option<O>,
  iter: I,
  selector: F,
  subscription: SingleAssignmentSubscription,
}

impl<T, U, R, Err, O, I, F> Observer<T, Err> for ZipIterObserver<O, I, F>
where
  O: Observer<R, Err>,
  I: Iterator<Item = Result<U, Err>>,
  F: FnMut(T, U) -> Result<R, Err>,
{
  fn next(&mut self, value: T) {
    if self.observer.is_none() {
      return;
    }
    let terminal = match self.iter.next() {
      Some(Ok(other)) => match (self.selector)(value, other) {
        Ok(zipped) => {
          if let Some(observer) = self.observer.as_mut() {
            observer.next(zipped);
          }
          return;
        }
        Err(err) => Terminal::Error(err),
      },
      Some(Err(err)) => Terminal::Error(err),
      None => Terminal::Complete,
    };
    terminal.deliver(self.observer.take());
    self.subscription.clone().unsubscribe();
  }

  fn error(self, err: Err) { Terminal::Error(err).deliver(self.observer); }

  fn complete(self) { Terminal::Complete.deliver(self.observer); }

  fn is_closed(&self) -> bool {
    self.subscription.is_closed() || self.observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

impl<S, I, U, R, F> CoreObservable for ZipIter<S, I, F>
where
  S: CoreObservable,
  I: Iterator<Item = Result<U, S::Err>> + Send + 'static,
  F: FnMut(S::Item, U) -> Result<R, S::Err> + Send + 'static,
{
  type Item = R;
  type Err = S::Err;
  type Unsub = SingleAssignmentSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SingleAssignmentSubscription
  where
    O: Observer<R, S::Err> + Send + 'static,
  {
    let ZipIter { source, iter, selector } = self;
    let subscription = SingleAssignmentSubscription::new();
    let observer =
      ZipIterObserver { observer: Some(observer), iter, selector, subscription: subscription.clone() };
    subscription.assign(source.actual_subscribe(observer));
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  fn sum(values: Vec<i32>) -> Result<i32, &'static str> { Ok(values.iter().sum()) }

  #[rxcombine_macro::test]
  fn pairs_by_position() {
    let scheduler = TestScheduler::new();
    let e0 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(150, 1), on_next(210, 1)]);
    let e1 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(150, 1), on_next(220, 2)]);
    let results = scheduler.start(move || factory::zip([e0, e1], sum));
    assert_eq!(results.messages(), vec![on_next(220, 3)]);
  }

  #[rxcombine_macro::test]
  fn completes_when_a_finished_source_runs_dry() {
    let scheduler = TestScheduler::new();
    let e0 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 1),
      on_next(215, 2),
      on_completed(230),
    ]);
    let e1 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(220, 10),
      on_next(240, 20),
      on_next(250, 30),
      on_completed(300),
    ]);
    let (a, b) = (e0.clone(), e1.clone());
    let results = scheduler.start(move || factory::zip([a, b], sum));
    assert_eq!(results.messages(), vec![on_next(220, 11), on_next(240, 22), on_completed(240)]);
    assert_eq!(e0.subscriptions(), vec![subscribed(200, 230)]);
    assert_eq!(e1.subscriptions(), vec![subscribed(200, 240)]);
  }

  #[rxcombine_macro::test]
  fn completion_with_empty_queue_is_immediate() {
    let scheduler = TestScheduler::new();
    let e0 = scheduler.create_hot_observable::<i32, &str>(vec![on_completed(210)]);
    let e1 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(205, 1), on_next(220, 2)]);
    let results = scheduler.start(move || e0.zip(e1));
    assert_eq!(results.messages(), vec![on_completed(210)]);
  }

  #[rxcombine_macro::test]
  fn selector_failure_becomes_error() {
    let scheduler = TestScheduler::new();
    let e0 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 1)]);
    let e1 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(220, 2)]);
    let results = scheduler
      .start(move || factory::zip([e0, e1], |_: Vec<i32>| Err::<i32, _>("selector failed")));
    assert_eq!(results.messages(), vec![on_error(220, "selector failed")]);
  }

  #[rxcombine_macro::test]
  fn two_source_zip_yields_tuples() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    from_iter::<_, ()>(vec![1, 2, 3])
      .zip(from_iter(vec![10, 20]))
      .subscribe_all(move |pair| s.lock().unwrap().push(pair), |_| {}, || {});
    assert_eq!(*seen.lock().unwrap(), vec![(1, 10), (2, 20)]);
  }

  #[rxcombine_macro::test]
  fn zip_with_iterator() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter::<_, &str>(vec![1, 2, 3])
      .zip_iter(vec![Ok(10), Ok(20)], |a, b| Ok(a + b))
      .subscribe_all(
        move |v| l1.lock().unwrap().push(format!("next {v}")),
        |_| {},
        move || l2.lock().unwrap().push("complete".to_owned()),
      );
    assert_eq!(*log.lock().unwrap(), vec!["next 11", "next 22", "complete"]);
  }

  #[rxcombine_macro::test]
  fn zip_iter_enumeration_failure() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter::<_, &str>(vec![1, 2])
      .zip_iter(vec![Ok(10), Err("enumerator failed")], |a, b| Ok(a * b))
      .subscribe_all(
        move |v| l1.lock().unwrap().push(format!("next {v}")),
        move |e| l2.lock().unwrap().push(format!("error {e}")),
        || {},
      );
    assert_eq!(*log.lock().unwrap(), vec!["next 10", "error enumerator failed"]);
  }
}
