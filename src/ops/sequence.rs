//! Sequential driver shared by `concat`, `catch` and `on_error_resume_next`.
//!
//! One source is live at a time. When it terminates, a [`Successor`] decides
//! what happens next: subscribe another source, or forward a terminal. The
//! driver runs as a trampoline, so a long chain of sources that terminate
//! synchronously inside `actual_subscribe` is walked in a loop instead of
//! recursing.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  observable::CoreObservable,
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{SerialSubscription, SingleAssignmentSubscription, Subscription},
};

/// What the driver does after a source terminates.
pub(crate) enum Step<S: CoreObservable> {
  Subscribe(S),
  Complete,
  Error(S::Err),
}

/// Produces the sources of a sequence, one at a time.
pub(crate) trait Successor {
  type Source: CoreObservable;

  fn first(&mut self) -> Step<Self::Source>;

  fn on_complete(&mut self) -> Step<Self::Source>;

  fn on_error(&mut self, err: <Self::Source as CoreObservable>::Err) -> Step<Self::Source>;
}

/// Pull the next source from a fallible iterator.
pub(crate) fn pull<I, S>(sources: &mut I) -> Option<Step<S>>
where
  I: Iterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  sources.next().map(|source| match source {
    Ok(source) => Step::Subscribe(source),
    Err(err) => Step::Error(err),
  })
}

struct SequenceState<P: Successor, O> {
  observer: Option<O>,
  successor: P,
  pending: Option<Step<P::Source>>,
}

struct Driver<P: Successor, O> {
  gate: MutArc<SequenceState<P, O>>,
  wip: Arc<AtomicUsize>,
  serial: SerialSubscription,
}

impl<P: Successor, O> Clone for Driver<P, O> {
  fn clone(&self) -> Self {
    Driver { gate: self.gate.clone(), wip: self.wip.clone(), serial: self.serial.clone() }
  }
}

/// Observer of the source that is currently live.
pub(crate) struct SequenceObserver<P: Successor, O> {
  driver: Driver<P, O>,
}

type ItemOf<P> = <<P as Successor>::Source as CoreObservable>::Item;
type ErrOf<P> = <<P as Successor>::Source as CoreObservable>::Err;

/// Subscribe `observer` to the sequence described by `successor`.
///
/// The returned subscription always holds the live source; unsubscribing it
/// ends the sequence.
pub(crate) fn subscribe_sequence<P, O>(successor: P, observer: O) -> SerialSubscription
where
  P: Successor + Send + 'static,
  P::Source: Send + 'static,
  ErrOf<P>: Send + 'static,
  O: Observer<ItemOf<P>, ErrOf<P>> + Send + 'static,
{
  let serial = SerialSubscription::new();
  let driver = Driver {
    gate: MutArc::own(SequenceState { observer: Some(observer), successor, pending: None }),
    wip: Arc::new(AtomicUsize::new(0)),
    serial: serial.clone(),
  };
  let first = driver.gate.rc_deref_mut().successor.first();
  driver.drain(first);
  serial
}

impl<P, O> Driver<P, O>
where
  P: Successor + Send + 'static,
  P::Source: Send + 'static,
  ErrOf<P>: Send + 'static,
  O: Observer<ItemOf<P>, ErrOf<P>> + Send + 'static,
{
  fn drain(&self, step: Step<P::Source>) {
    self.gate.rc_deref_mut().pending = Some(step);
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      let step = self.gate.rc_deref_mut().pending.take();
      match step {
        Some(Step::Subscribe(source)) => self.subscribe(source),
        Some(Step::Complete) => {
          let observer = self.gate.rc_deref_mut().observer.take();
          if let Some(observer) = observer {
            observer.complete();
          }
          self.serial.clone().unsubscribe();
        }
        Some(Step::Error(err)) => {
          let observer = self.gate.rc_deref_mut().observer.take();
          if let Some(observer) = observer {
            observer.error(err);
          }
          self.serial.clone().unsubscribe();
        }
        None => {}
      }
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        break;
      }
    }
  }

  fn subscribe(&self, source: P::Source) {
    if self.serial.is_closed() {
      return;
    }
    tracing::trace!("sequence advancing to next source");
    let slot = SingleAssignmentSubscription::new();
    self.serial.set(slot.clone());
    let unsub = source.actual_subscribe(SequenceObserver { driver: self.clone() });
    slot.assign(unsub);
  }
}

impl<P, O> Observer<ItemOf<P>, ErrOf<P>> for SequenceObserver<P, O>
where
  P: Successor + Send + 'static,
  P::Source: Send + 'static,
  ErrOf<P>: Send + 'static,
  O: Observer<ItemOf<P>, ErrOf<P>> + Send + 'static,
{
  fn next(&mut self, value: ItemOf<P>) {
    if self.driver.serial.is_closed() {
      return;
    }
    if let Some(observer) = self.driver.gate.rc_deref_mut().observer.as_mut() {
      observer.next(value);
    }
  }

  fn error(self, err: ErrOf<P>) {
    let step = {
      let mut state = self.driver.gate.rc_deref_mut();
      if state.observer.is_none() {
        return;
      }
      state.successor.on_error(err)
    };
    self.driver.drain(step);
  }

  fn complete(self) {
    let step = {
      let mut state = self.driver.gate.rc_deref_mut();
      if state.observer.is_none() {
        return;
      }
      state.successor.on_complete()
    };
    self.driver.drain(step);
  }

  fn is_closed(&self) -> bool {
    self.driver.serial.is_closed()
      || self.driver.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}
