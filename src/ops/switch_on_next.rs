//! SwitchOnNext operator implementation
//!
//! Flattens an observable of observables by listening to the most recent
//! inner observable only. A new inner releases the previous one at once,
//! even mid-stream. Every inner is tagged with an id when it arrives and a
//! notification from anything but the latest id is dropped.
//!
//! The stream completes once the outer observable has completed and the
//! latest inner, if any, has completed too.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::Terminal,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{
    CompositeSubscription, SerialSubscription, SingleAssignmentSubscription, Subscription,
  },
};

/// SwitchOnNext operator
#[derive(Clone)]
pub struct SwitchOnNext<S> {
  pub source: S,
}

struct SwitchState<O> {
  observer: Option<O>,
  latest: u64,
  has_inner: bool,
  outer_done: bool,
}

struct Switcher<O> {
  gate: MutArc<SwitchState<O>>,
  group: CompositeSubscription,
  inner: SerialSubscription,
}

impl<O> Clone for Switcher<O> {
  fn clone(&self) -> Self {
    Switcher { gate: self.gate.clone(), group: self.group.clone(), inner: self.inner.clone() }
  }
}

impl<O> Switcher<O> {
  /// Deliver `terminal` to the observer already taken out of the gate.
  fn finish<Item, Err>(&self, observer: Option<O>, terminal: Terminal<Err>)
  where
    O: Observer<Item, Err>,
  {
    terminal.deliver(observer);
    self.group.clone().unsubscribe();
  }

  fn observer_closed<Item, Err>(&self) -> bool
  where
    O: Observer<Item, Err>,
  {
    self.group.is_closed() || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

/// Observer of the outer observable.
pub struct SwitchOuterObserver<O> {
  switcher: Switcher<O>,
  slot: SingleAssignmentSubscription,
}

/// Observer of one inner observable, tagged with its arrival id.
pub struct SwitchInnerObserver<O> {
  switcher: Switcher<O>,
  id: u64,
  slot: SingleAssignmentSubscription,
}

impl<Inner, O> Observer<Inner, Inner::Err> for SwitchOuterObserver<O>
where
  Inner: CoreObservable,
  O: Observer<Inner::Item, Inner::Err> + Send + 'static,
{
  fn next(&mut self, inner: Inner) {
    if self.switcher.group.is_closed() {
      return;
    }
    let id = {
      let mut state = self.switcher.gate.rc_deref_mut();
      if state.observer.is_none() {
        return;
      }
      if state.has_inner {
        tracing::debug!(replaced = state.latest, "switch replacing the active inner observable");
      }
      state.latest += 1;
      state.has_inner = true;
      state.latest
    };
    let slot = SingleAssignmentSubscription::new();
    self.switcher.inner.set(slot.clone());
    let observer = SwitchInnerObserver { switcher: self.switcher.clone(), id, slot: slot.clone() };
    slot.assign(inner.actual_subscribe(observer));
  }

  fn error(self, err: Inner::Err) {
    let observer = self.switcher.gate.rc_deref_mut().observer.take();
    self.switcher.finish(observer, Terminal::Error(err));
  }

  fn complete(self) {
    let observer = {
      let mut state = self.switcher.gate.rc_deref_mut();
      state.outer_done = true;
      if state.has_inner {
        None
      } else {
        Some(state.observer.take())
      }
    };
    match observer {
      Some(observer) => self.switcher.finish(observer, Terminal::<Inner::Err>::Complete),
      None => self.slot.unsubscribe(),
    }
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.switcher.observer_closed() }
}

impl<Item, Err, O> Observer<Item, Err> for SwitchInnerObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.slot.is_closed() {
      return;
    }
    let mut state = self.switcher.gate.rc_deref_mut();
    if state.latest != self.id {
      return;
    }
    if let Some(observer) = state.observer.as_mut() {
      observer.next(value);
    }
  }

  fn error(self, err: Err) {
    let observer = {
      let mut state = self.switcher.gate.rc_deref_mut();
      if state.latest != self.id {
        return;
      }
      state.observer.take()
    };
    self.switcher.finish(observer, Terminal::Error(err));
  }

  fn complete(self) {
    let observer = {
      let mut state = self.switcher.gate.rc_deref_mut();
      if state.latest != self.id {
        return;
      }
      state.has_inner = false;
      if state.outer_done {
        Some(state.observer.take())
      } else {
        None
      }
    };
    match observer {
      Some(observer) => self.switcher.finish(observer, Terminal::Complete),
      None => self.slot.unsubscribe(),
    }
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.switcher.observer_closed() }
}

impl<S> CoreObservable for SwitchOnNext<S>
where
  S: CoreObservable,
  S::Item: CoreObservable<Err = S::Err>,
{
  type Item = <S::Item as CoreObservable>::Item;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let group = CompositeSubscription::new();
    let inner = SerialSubscription::new();
    group.add(inner.clone());
    let slot = SingleAssignmentSubscription::new();
    group.add(slot.clone());

    let switcher = Switcher {
      gate: MutArc::own(SwitchState {
        observer: Some(observer),
        latest: 0,
        has_inner: false,
        outer_done: false,
      }),
      group: group.clone(),
      inner,
    };
    slot.assign(self.source.actual_subscribe(SwitchOuterObserver { switcher, slot: slot.clone() }));
    group
  }
}
