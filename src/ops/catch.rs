//! Catch operator implementation
//!
//! Two forms share the sequential driver:
//!
//! - [`Catch`]: on an error accepted by the predicate, the handler builds a
//!   replacement source and the stream continues with it. The handler runs at
//!   most once; a handler returning `Err` ends the stream with that error.
//! - [`CatchSequence`]: each failing source hands over to the next one from an
//!   iterator. The error of the last source is forwarded.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::sequence::{pull, subscribe_sequence, Step, Successor},
  subscription::{EitherSubscription, SerialSubscription},
};

/// Recovers from an error of `source` with the observable built by `handler`.
#[derive(Clone)]
pub struct Catch<S, P, F> {
  source: S,
  predicate: P,
  handler: F,
}

impl<S, P, F> Catch<S, P, F> {
  pub fn new(source: S, predicate: P, handler: F) -> Self { Catch { source, predicate, handler } }
}

/// Either the original source or the handler's replacement.
pub enum CatchSource<S, S2> {
  Source(S),
  Fallback(S2),
}

impl<S, S2> CoreObservable for CatchSource<S, S2>
where
  S: CoreObservable,
  S2: CoreObservable<Item = S::Item, Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = EitherSubscription<S::Unsub, S2::Unsub>;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    match self {
      CatchSource::Source(s) => EitherSubscription::Left(s.actual_subscribe(observer)),
      CatchSource::Fallback(s) => EitherSubscription::Right(s.actual_subscribe(observer)),
    }
  }
}

struct HandlerSuccessor<S, S2, P, F> {
  source: Option<S>,
  predicate: P,
  handler: Option<F>,
  _fallback: std::marker::PhantomData<fn() -> S2>,
}

impl<S, S2, P, F> Successor for HandlerSuccessor<S, S2, P, F>
where
  S: CoreObservable,
  S2: CoreObservable<Item = S::Item, Err = S::Err>,
  P: FnMut(&S::Err) -> bool,
  F: FnOnce(S::Err) -> Result<S2, S::Err>,
{
  type Source = CatchSource<S, S2>;

  fn first(&mut self) -> Step<Self::Source> {
    match self.source.take() {
      Some(source) => Step::Subscribe(CatchSource::Source(source)),
      None => Step::Complete,
    }
  }

  fn on_complete(&mut self) -> Step<Self::Source> { Step::Complete }

  fn on_error(&mut self, err: S::Err) -> Step<Self::Source> {
    let handler = match self.handler.take() {
      Some(handler) if (self.predicate)(&err) => handler,
      _ => return Step::Error(err),
    };
    match handler(err) {
      Ok(fallback) => {
        tracing::debug!("catch switching to fallback source");
        Step::Subscribe(CatchSource::Fallback(fallback))
      }
      Err(err) => Step::Error(err),
    }
  }
}

impl<S, S2, P, F> CoreObservable for Catch<S, P, F>
where
  S: CoreObservable + Send + 'static,
  S2: CoreObservable<Item = S::Item, Err = S::Err> + Send + 'static,
  S::Err: Send + 'static,
  P: FnMut(&S::Err) -> bool + Send + 'static,
  F: FnOnce(S::Err) -> Result<S2, S::Err> + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SerialSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SerialSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let successor = HandlerSuccessor {
      source: Some(self.source),
      predicate: self.predicate,
      handler: Some(self.handler),
      _fallback: std::marker::PhantomData,
    };
    subscribe_sequence(successor, observer)
  }
}

/// Continues with the next source of `sources` whenever the current one
/// fails.
#[derive(Clone)]
pub struct CatchSequence<I> {
  pub sources: I,
}

struct SequenceSuccessor<I>(I);

impl<I, S> Successor for SequenceSuccessor<I>
where
  I: Iterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  type Source = S;

  fn first(&mut self) -> Step<S> { pull(&mut self.0).unwrap_or(Step::Complete) }

  fn on_complete(&mut self) -> Step<S> { Step::Complete }

  fn on_error(&mut self, err: S::Err) -> Step<S> {
    pull(&mut self.0).unwrap_or(Step::Error(err))
  }
}

impl<I, S> CoreObservable for CatchSequence<I>
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
    subscribe_sequence(SequenceSuccessor(self.sources), observer)
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn handler_replaces_failed_source() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 2),
      on_error(230, "boom"),
    ]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(220, 9),
      on_next(240, 3),
      on_completed(250),
    ]);
    let (a, b) = (o1.clone(), o2.clone());
    let results = scheduler.start(move || a.catch(move |_| Ok(b)));

    assert_eq!(results.messages(), vec![on_next(210, 2), on_next(240, 3), on_completed(250)]);
    assert_eq!(o1.subscriptions(), vec![subscribed(200, 230)]);
    assert_eq!(o2.subscriptions(), vec![subscribed(230, 250)]);
  }

  #[rxcombine_macro::test]
  fn handler_failure_is_terminal() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![on_error(230, "boom")]);
    let results = scheduler
      .start(move || o1.catch(|_| Err::<Never<i32, &str>, _>("handler failed")));
    assert_eq!(results.messages(), vec![on_error(230, "handler failed")]);
  }

  #[rxcombine_macro::test]
  fn fallback_error_is_not_caught_again() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![on_error(230, "first")]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![on_error(240, "second")]);
    let results = scheduler.start(move || o1.catch(move |_| Ok(o2)));
    assert_eq!(results.messages(), vec![on_error(240, "second")]);
  }

  #[derive(Debug, Clone, PartialEq)]
  enum Failure {
    Transient,
    Fatal,
  }

  fn recover_transient(failure: Failure) -> Vec<Message<i32, Failure>> {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable::<i32, Failure>(vec![on_error(210, failure)]);
    let fallback = scheduler.create_hot_observable::<i32, Failure>(vec![on_next(220, 1)]);
    scheduler
      .start(move || {
        source.catch_when(|e: &Failure| *e == Failure::Transient, move |_| Ok(fallback))
      })
      .messages()
  }

  #[rxcombine_macro::test]
  fn predicate_filters_errors() {
    assert_eq!(recover_transient(Failure::Transient), vec![on_next(220, 1)]);
    assert_eq!(recover_transient(Failure::Fatal), vec![on_error(210, Failure::Fatal)]);
  }

  #[rxcombine_macro::test]
  fn sequence_moves_past_failures() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 1),
      on_error(220, "a"),
    ]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(230, 2),
      on_error(240, "b"),
    ]);
    let o3 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(250, 3),
      on_error(260, "c"),
    ]);
    let results = scheduler.start(move || factory::catch([o1, o2, o3]));
    assert_eq!(
      results.messages(),
      vec![on_next(210, 1), on_next(230, 2), on_next(250, 3), on_error(260, "c")]
    );
  }

  #[rxcombine_macro::test]
  fn sequence_stops_at_first_completion() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![on_completed(220)]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(230, 2)]);
    let later = o2.clone();
    let results = scheduler.start(move || factory::catch([o1, o2]));
    assert_eq!(results.messages(), vec![on_completed(220)]);
    assert!(later.subscriptions().is_empty());
  }
}
