//! TakeUntil operator implementation
//!
//! Emits the values of the source until a second observable, `other`,
//! notifies. A value from `other` completes the stream and an error from it
//! fails the stream. `other` completing without a value is not a trigger; it
//! is simply released.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::{SourceSlots, Terminal},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::CompositeSubscription,
};

const SOURCE: usize = 0;
const OTHER: usize = 1;

/// TakeUntil operator
#[derive(Clone)]
pub struct TakeUntil<S, N> {
  pub source: S,
  pub other: N,
}

/// Observer for the source observable
pub struct TakeUntilObserver<O> {
  gate: MutArc<Option<O>>,
  slots: SourceSlots,
}

/// Observer for `other`
///
/// The downstream item type is erased through function pointers so the
/// observer can accept values of any type from `other`.
pub struct TakeUntilOtherObserver<O, Err> {
  gate: MutArc<Option<O>>,
  slots: SourceSlots,
  complete_fn: fn(O),
  error_fn: fn(O, Err),
}

impl<O, Err> TakeUntilOtherObserver<O, Err> {
  fn new<Item>(gate: MutArc<Option<O>>, slots: SourceSlots) -> Self
  where
    O: Observer<Item, Err>,
  {
    Self { gate, slots, complete_fn: |o| o.complete(), error_fn: |o, e| o.error(e) }
  }

  fn trigger(&self, deliver: impl FnOnce(O)) {
    let observer = self.gate.rc_deref_mut().take();
    if let Some(observer) = observer {
      deliver(observer);
    }
    self.slots.release_all();
  }
}

fn finish<Item, Err, O>(gate: &MutArc<Option<O>>, slots: &SourceSlots, terminal: Terminal<Err>)
where
  O: Observer<Item, Err>,
{
  let observer = gate.rc_deref_mut().take();
  terminal.deliver(observer);
  slots.release_all();
}

impl<Item, Err, O> Observer<Item, Err> for TakeUntilObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.slots.is_closed(SOURCE) {
      return;
    }
    if let Some(observer) = self.gate.rc_deref_mut().as_mut() {
      observer.next(value);
    }
  }

  fn error(self, err: Err) { finish(&self.gate, &self.slots, Terminal::Error(err)); }

  fn complete(self) { finish(&self.gate, &self.slots, Terminal::Complete); }

  fn is_closed(&self) -> bool {
    self.slots.is_closed(SOURCE) || self.gate.rc_deref().as_ref().is_none_or(|o| o.is_closed())
  }
}

impl<NItem, Err, O> Observer<NItem, Err> for TakeUntilOtherObserver<O, Err> {
  fn next(&mut self, _value: NItem) {
    if self.slots.is_closed(OTHER) {
      return;
    }
    self.trigger(self.complete_fn);
  }

  fn error(self, err: Err) {
    let error_fn = self.error_fn;
    self.trigger(|observer| error_fn(observer, err));
  }

  fn complete(self) { self.slots.release(OTHER); }

  fn is_closed(&self) -> bool { self.slots.is_closed(OTHER) || self.gate.rc_deref().is_none() }
}

impl<S, N> CoreObservable for TakeUntil<S, N>
where
  S: CoreObservable,
  S::Err: 'static,
  N: CoreObservable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let TakeUntil { source, other } = self;
    let slots = SourceSlots::new(2);
    let gate = MutArc::own(Some(observer));

    let other_observer = TakeUntilOtherObserver::new::<S::Item>(gate.clone(), slots.clone());
    slots.assign(OTHER, other.actual_subscribe(other_observer));
    if !slots.is_group_closed() {
      slots.assign(SOURCE, source.actual_subscribe(TakeUntilObserver { gate, slots: slots.clone() }));
    }
    slots.group()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn completes_when_other_emits() {
    let scheduler = TestScheduler::new();
    let l = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 2),
      on_next(220, 3),
      on_next(230, 4),
    ]);
    let r = scheduler.create_hot_observable::<i32, &str>(vec![on_next(225, 99)]);
    let (source, other) = (l.clone(), r.clone());
    let results = scheduler.start(move || source.take_until(other));

    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(220, 3), on_completed(225)]);
    assert_eq!(l.subscriptions(), vec![subscribed(200, 225)]);
    assert_eq!(r.subscriptions(), vec![subscribed(200, 225)]);
  }

  #[rxcombine_macro::test]
  fn other_error_fails_the_stream() {
    let scheduler = TestScheduler::new();
    let l = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 2), on_next(230, 4)]);
    let r = scheduler.create_hot_observable::<(), &str>(vec![on_error(225, "stop")]);
    let results = scheduler.start(move || l.take_until(r));

    assert_eq!(results.messages(), vec![on_next(210, 2), on_error(225, "stop")]);
  }

  #[rxcombine_macro::test]
  fn silent_other_completion_is_not_a_trigger() {
    let scheduler = TestScheduler::new();
    let l = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 2),
      on_next(230, 4),
      on_completed(240),
    ]);
    let r = scheduler.create_hot_observable::<(), &str>(vec![on_completed(220)]);
    let recorded = r.clone();
    let results = scheduler.start(move || l.take_until(r));

    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(230, 4), on_completed(240)]);
    assert_eq!(recorded.subscriptions(), vec![subscribed(200, 220)]);
  }

  #[rxcombine_macro::test]
  fn source_error_propagates_first() {
    let scheduler = TestScheduler::new();
    let l = scheduler.create_hot_observable::<i32, &str>(vec![on_error(215, "source")]);
    let r = scheduler.create_hot_observable::<(), &str>(vec![on_next(225, ())]);
    let recorded = r.clone();
    let results = scheduler.start(move || l.take_until(r));

    assert_eq!(results.messages(), vec![on_error(215, "source")]);
    assert_eq!(recorded.subscriptions(), vec![subscribed(200, 215)]);
  }

  #[rxcombine_macro::test]
  fn synchronous_other_skips_the_source() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter::<_, ()>(vec![1, 2, 3]).take_until(of(())).subscribe_all(
      move |v| l1.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || l2.lock().unwrap().push("complete".to_owned()),
    );
    assert_eq!(*log.lock().unwrap(), vec!["complete"]);
  }
}
