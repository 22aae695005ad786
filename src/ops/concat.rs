//! Concat operator implementation
//!
//! Subscribes to each source in turn, starting the next one only after the
//! current one completes. The first error ends the whole sequence.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::sequence::{pull, subscribe_sequence, Step, Successor},
  subscription::SerialSubscription,
};

/// Concatenation of the sources yielded by `sources`.
///
/// An `Err` element of the iterator fails the stream when it is reached.
#[derive(Clone)]
pub struct Concat<I> {
  pub sources: I,
}

struct ConcatSuccessor<I>(I);

impl<I, S> Successor for ConcatSuccessor<I>
where
  I: Iterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  type Source = S;

  fn first(&mut self) -> Step<S> { self.on_complete() }

  fn on_complete(&mut self) -> Step<S> { pull(&mut self.0).unwrap_or(Step::Complete) }

  fn on_error(&mut self, err: S::Err) -> Step<S> { Step::Error(err) }
}

impl<I, S> CoreObservable for Concat<I>
where
  I: Iterator<Item = Result<S, S::Err>> + Send + 'static,
  S: CoreObservable + Send + 'static,
  S::Err: Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SerialSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SerialSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    subscribe_sequence(ConcatSuccessor(self.sources), observer)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn scenario_two_sources() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, ()>(vec![
      on_next(150, 1),
      on_next(210, 2),
      on_completed(230),
    ]);
    let o2 = scheduler.create_hot_observable::<i32, ()>(vec![
      on_next(150, 1),
      on_next(240, 3),
      on_completed(250),
    ]);
    let (a, b) = (o1.clone(), o2.clone());
    let results = scheduler.start(move || a.concat(b));

    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(240, 3), on_completed(250)]);
    assert_eq!(o1.subscriptions(), vec![subscribed(200, 230)]);
    assert_eq!(o2.subscriptions(), vec![subscribed(230, 250)]);
  }

  #[rxcombine_macro::test]
  fn error_stops_the_chain() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![on_error(230, "boom")]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(240, 3)]);
    let (a, b) = (o1.clone(), o2.clone());
    let results = scheduler.start(move || a.concat(b));

    assert_eq!(results.messages(), vec![on_error(230, "boom")]);
    assert!(o2.subscriptions().is_empty());
  }

  #[rxcombine_macro::test]
  fn long_synchronous_chain_does_not_recurse() {
    let count = Arc::new(Mutex::new(0));
    let done = Arc::new(Mutex::new(false));
    let (c, d) = (count.clone(), done.clone());
    factory::concat((0..100_000).map(|v| of::<_, ()>(v))).subscribe_all(
      move |_| *c.lock().unwrap() += 1,
      |_| {},
      move || *d.lock().unwrap() = true,
    );
    assert_eq!(*count.lock().unwrap(), 100_000);
    assert!(*done.lock().unwrap());
  }

  #[rxcombine_macro::test]
  fn enumeration_failure_becomes_error() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    let sources = vec![Ok(of(1)), Err("no more sources"), Ok(of(3))];
    factory::try_concat(sources).subscribe_all(
      move |v: i32| l1.lock().unwrap().push(format!("next {v}")),
      move |e: &str| l2.lock().unwrap().push(format!("error {e}")),
      || {},
    );
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "error no more sources"]);
  }

  #[rxcombine_macro::test]
  fn empty_sequence_completes() {
    let done = Arc::new(Mutex::new(false));
    let d = done.clone();
    factory::concat(Vec::<Of<i32, ()>>::new()).subscribe_all(
      |_| {},
      |_| {},
      move || *d.lock().unwrap() = true,
    );
    assert!(*done.lock().unwrap());
  }
}
