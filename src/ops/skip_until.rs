//! SkipUntil operator implementation
//!
//! Drops the values of the source until a second observable, `other`, emits
//! its first value. From then on every value of the source passes through.
//!
//! `other` is released as soon as it opens the stream. An error from `other`
//! fails the stream whether or not it is open. If `other` completes without a
//! value the stream never opens, and a source completion that arrives while
//! it is still closed is swallowed.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::{SourceSlots, Terminal},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::CompositeSubscription,
};

const SOURCE: usize = 0;
const OTHER: usize = 1;

/// SkipUntil operator
#[derive(Clone)]
pub struct SkipUntil<S, N> {
  pub source: S,
  pub other: N,
}

struct SkipState<O> {
  observer: Option<O>,
  open: bool,
}

/// Observer for the source observable
pub struct SkipUntilObserver<O> {
  gate: MutArc<SkipState<O>>,
  slots: SourceSlots,
}

/// Observer for `other`
pub struct SkipUntilOtherObserver<O, Err> {
  gate: MutArc<SkipState<O>>,
  slots: SourceSlots,
  error_fn: fn(O, Err),
}

impl<O> SkipUntilObserver<O> {
  fn finish<Item, Err>(&self, terminal: Terminal<Err>)
  where
    O: Observer<Item, Err>,
  {
    let observer = self.gate.rc_deref_mut().observer.take();
    terminal.deliver(observer);
    self.slots.release_all();
  }
}

impl<Item, Err, O> Observer<Item, Err> for SkipUntilObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.slots.is_closed(SOURCE) {
      return;
    }
    let mut state = self.gate.rc_deref_mut();
    if !state.open {
      return;
    }
    if let Some(observer) = state.observer.as_mut() {
      observer.next(value);
    }
  }

  fn error(self, err: Err) { self.finish(Terminal::Error(err)); }

  fn complete(self) {
    let open = self.gate.rc_deref().open;
    if open {
      self.finish(Terminal::Complete);
    } else {
      tracing::trace!("skip_until source completed before it was opened");
      self.slots.release(SOURCE);
    }
  }

  fn is_closed(&self) -> bool {
    self.slots.is_closed(SOURCE)
      || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

impl<NItem, Err, O> Observer<NItem, Err> for SkipUntilOtherObserver<O, Err> {
  fn next(&mut self, _value: NItem) {
    if self.slots.is_closed(OTHER) {
      return;
    }
    self.gate.rc_deref_mut().open = true;
    tracing::debug!("skip_until opened");
    self.slots.release(OTHER);
  }

  fn error(self, err: Err) {
    let observer = self.gate.rc_deref_mut().observer.take();
    if let Some(observer) = observer {
      (self.error_fn)(observer, err);
    }
    self.slots.release_all();
  }

  fn complete(self) { self.slots.release(OTHER); }

  fn is_closed(&self) -> bool {
    self.slots.is_closed(OTHER) || self.gate.rc_deref().observer.is_none()
  }
}

impl<S, N> CoreObservable for SkipUntil<S, N>
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
    let SkipUntil { source, other } = self;
    let slots = SourceSlots::new(2);
    let gate = MutArc::own(SkipState { observer: Some(observer), open: false });

    let other_observer = SkipUntilOtherObserver {
      gate: gate.clone(),
      slots: slots.clone(),
      error_fn: |o: O, e: S::Err| o.error(e),
    };
    slots.assign(OTHER, other.actual_subscribe(other_observer));
    if !slots.is_group_closed() {
      slots.assign(SOURCE, source.actual_subscribe(SkipUntilObserver { gate, slots: slots.clone() }));
    }
    slots.group()
  }
}
