//! Shared engine behind Buffer and Window.
//!
//! Both operators cut the source into groups of consecutive values. They only
//! differ in what a group is and when it reaches the subscriber:
//!
//! - a buffer is a `Vec` handed downstream when the group closes;
//! - a window is a nested stream handed downstream when the group opens and
//!   completed when it closes.
//!
//! Groups open and close on one of three triggers. [`Boundary`] keeps exactly
//! one group open and rotates it each time the boundary emits. [`When`] does
//! the same, but asks a closing selector for a fresh closing observable per
//! group. [`Toggle`] opens a group on every value of an openings observable
//! and closes it when the closing observable made for it notifies, so groups
//! may overlap and a value is cloned into every open group.
//!
//! A closing observable fires on its first value or on its completion, and it
//! is released as soon as it fires. Completion of the source flushes every
//! open group before the stream completes. An error drops open buffers and is
//! forwarded to open windows.

use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::Terminal,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{
    CompositeSubscription, SerialSubscription, SingleAssignmentSubscription, Subscription,
  },
};

/// One group of values.
pub trait Group<Err>: Sized {
  type Item;
  /// What the subscriber receives.
  type Output;

  /// A fresh group, plus anything to emit the moment it opens.
  fn open() -> (Self, Option<Self::Output>);

  fn push(&mut self, value: Self::Item);

  /// Close the group, returning anything to emit for it.
  fn close(self) -> Option<Self::Output>;

  /// The stream failed while the group was open.
  fn fail(self, err: &Err);
}

/// Chooses the group type for a given item and error type.
pub trait GroupKind<Item, Err> {
  type Group: Group<Err, Item = Item>;
}

/// Open and close triggers.
pub struct Boundary<B>(pub(crate) B);

pub struct When<F>(pub(crate) F);

pub struct Toggle<Op, F> {
  pub(crate) openings: Op,
  pub(crate) closing_selector: F,
}

/// Buffer or Window of `source`, cut by `trigger`.
pub struct Grouped<S, T, K> {
  source: S,
  trigger: T,
  _kind: PhantomData<fn() -> K>,
}

impl<S: Clone, T: Clone, K> Clone for Grouped<S, T, K> {
  fn clone(&self) -> Self {
    Grouped { source: self.source.clone(), trigger: self.trigger.clone(), _kind: PhantomData }
  }
}

impl<B: Clone> Clone for Boundary<B> {
  fn clone(&self) -> Self { Boundary(self.0.clone()) }
}

impl<F: Clone> Clone for When<F> {
  fn clone(&self) -> Self { When(self.0.clone()) }
}

impl<Op: Clone, F: Clone> Clone for Toggle<Op, F> {
  fn clone(&self) -> Self {
    Toggle { openings: self.openings.clone(), closing_selector: self.closing_selector.clone() }
  }
}

impl<S, B, K> Grouped<S, Boundary<B>, K> {
  pub fn new(source: S, boundary: B) -> Self {
    Grouped { source, trigger: Boundary(boundary), _kind: PhantomData }
  }
}

impl<S, F, K> Grouped<S, When<F>, K> {
  pub fn new(source: S, closing_selector: F) -> Self {
    Grouped { source, trigger: When(closing_selector), _kind: PhantomData }
  }
}

impl<S, Op, F, K> Grouped<S, Toggle<Op, F>, K> {
  pub fn new(source: S, openings: Op, closing_selector: F) -> Self {
    Grouped { source, trigger: Toggle { openings, closing_selector }, _kind: PhantomData }
  }
}

// ==================== Shared state ====================

struct GroupState<G, O> {
  observer: Option<O>,
  open: SmallVec<[(usize, G); 1]>,
  next_id: usize,
}

/// The gate plus every subscription of one Buffer/Window subscription.
pub struct Grouper<G, O> {
  gate: MutArc<GroupState<G, O>>,
  subscriptions: CompositeSubscription,
}

impl<G, O> Clone for Grouper<G, O> {
  fn clone(&self) -> Self {
    Grouper { gate: self.gate.clone(), subscriptions: self.subscriptions.clone() }
  }
}

impl<G, O> Grouper<G, O> {
  fn new(observer: O) -> Self {
    Grouper {
      gate: MutArc::own(GroupState { observer: Some(observer), open: SmallVec::new(), next_id: 0 }),
      subscriptions: CompositeSubscription::new(),
    }
  }

  fn is_closed(&self) -> bool { self.subscriptions.is_closed() }

  fn observer_closed<Err>(&self) -> bool
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    self.subscriptions.is_closed()
      || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }

  fn open_in<Err>(state: &mut GroupState<G, O>) -> usize
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    let (group, emitted) = G::open();
    let id = state.next_id;
    state.next_id += 1;
    state.open.push((id, group));
    if let (Some(emitted), Some(observer)) = (emitted, state.observer.as_mut()) {
      observer.next(emitted);
    }
    tracing::trace!(id, open = state.open.len(), "group opened");
    id
  }

  fn close_in<Err>(state: &mut GroupState<G, O>, id: usize) -> bool
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    let Some(position) = state.open.iter().position(|(open, _)| *open == id) else {
      return false;
    };
    let (_, group) = state.open.remove(position);
    if let (Some(emitted), Some(observer)) = (group.close(), state.observer.as_mut()) {
      observer.next(emitted);
    }
    tracing::trace!(id, open = state.open.len(), "group closed");
    true
  }

  /// Open a group; `None` once the stream has terminated.
  fn open<Err>(&self) -> Option<usize>
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    let mut state = self.gate.rc_deref_mut();
    state.observer.as_ref()?;
    Some(Self::open_in(&mut state))
  }

  /// Close group `id`; `false` if it was no longer open.
  fn close<Err>(&self, id: usize) -> bool
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    let mut state = self.gate.rc_deref_mut();
    state.observer.is_some() && Self::close_in(&mut state, id)
  }

  /// Close group `id`, or every open group if `id` is `None`, and open the
  /// next one in the same step. Returns the new id.
  fn rotate<Err>(&self, id: Option<usize>) -> Option<usize>
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    let mut state = self.gate.rc_deref_mut();
    state.observer.as_ref()?;
    match id {
      Some(id) => {
        if !Self::close_in(&mut state, id) {
          return None;
        }
      }
      None => {
        let ids: SmallVec<[usize; 1]> = state.open.iter().map(|(id, _)| *id).collect();
        for id in ids {
          Self::close_in(&mut state, id);
        }
      }
    }
    Some(Self::open_in(&mut state))
  }

  fn push<Err>(&self, value: G::Item)
  where
    G: Group<Err>,
    G::Item: Clone,
  {
    let mut state = self.gate.rc_deref_mut();
    if state.observer.is_none() {
      return;
    }
    if let Some(((_, last), rest)) = state.open.split_last_mut() {
      for (_, group) in rest {
        group.push(value.clone());
      }
      last.push(value);
    }
  }

  /// Deliver `terminal`: completion flushes every open group first, an error
  /// is passed to them instead.
  fn finish<Err>(&self, terminal: Terminal<Err>)
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    let (observer, open) = {
      let mut state = self.gate.rc_deref_mut();
      (state.observer.take(), std::mem::take(&mut state.open))
    };
    if let Some(mut observer) = observer {
      match terminal {
        Terminal::Complete => {
          for (_, group) in open {
            if let Some(emitted) = group.close() {
              observer.next(emitted);
            }
          }
          observer.complete();
        }
        Terminal::Error(err) => {
          for (_, group) in open {
            group.fail(&err);
          }
          observer.error(err);
        }
      }
    }
    self.subscriptions.clone().unsubscribe();
  }

  /// Subscribe the source in its own slot.
  fn subscribe_source<S, Err>(&self, source: S)
  where
    S: CoreObservable<Item = G::Item, Err = Err>,
    G: Group<Err> + Send + 'static,
    G::Item: Clone,
    O: Observer<G::Output, Err> + Send + 'static,
  {
    let slot = SingleAssignmentSubscription::new();
    if self.subscriptions.add(slot.clone()).is_none() {
      return;
    }
    let observer = GroupSourceObserver { grouper: self.clone(), slot: slot.clone() };
    slot.assign(source.actual_subscribe(observer));
  }
}

/// Observer of the source values.
pub struct GroupSourceObserver<G, O> {
  grouper: Grouper<G, O>,
  slot: SingleAssignmentSubscription,
}

impl<Err, G, O> Observer<G::Item, Err> for GroupSourceObserver<G, O>
where
  G: Group<Err>,
  G::Item: Clone,
  O: Observer<G::Output, Err>,
{
  fn next(&mut self, value: G::Item) {
    if self.slot.is_closed() || self.grouper.is_closed() {
      return;
    }
    self.grouper.push(value);
  }

  fn error(self, err: Err) { self.grouper.finish(Terminal::Error(err)); }

  fn complete(self) { self.grouper.finish(Terminal::Complete); }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.grouper.observer_closed() }
}

// ==================== Boundary ====================

/// Observer of a boundary observable.
pub struct BoundaryObserver<G, O> {
  grouper: Grouper<G, O>,
  slot: SingleAssignmentSubscription,
}

impl<BItem, Err, G, O> Observer<BItem, Err> for BoundaryObserver<G, O>
where
  G: Group<Err>,
  O: Observer<G::Output, Err>,
{
  fn next(&mut self, _value: BItem) {
    if self.slot.is_closed() || self.grouper.is_closed() {
      return;
    }
    self.grouper.rotate(None);
  }

  fn error(self, err: Err) { self.grouper.finish(Terminal::Error(err)); }

  fn complete(self) { self.grouper.finish(Terminal::Complete); }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.grouper.observer_closed() }
}

impl<S, B, K> CoreObservable for Grouped<S, Boundary<B>, K>
where
  S: CoreObservable,
  S::Item: Clone,
  B: CoreObservable<Err = S::Err>,
  K: GroupKind<S::Item, S::Err>,
  K::Group: Send + 'static,
{
  type Item = <K::Group as Group<S::Err>>::Output;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let grouper = Grouper::<K::Group, O>::new(observer);
    grouper.open::<S::Err>();
    grouper.subscribe_source(self.source);

    let slot = SingleAssignmentSubscription::new();
    if grouper.subscriptions.add(slot.clone()).is_some() {
      let observer = BoundaryObserver { grouper: grouper.clone(), slot: slot.clone() };
      slot.assign(self.trigger.0.actual_subscribe(observer));
    }
    grouper.subscriptions
  }
}

// ==================== When ====================

/// State shared by the closing observers of a closing selector.
pub struct WhenShared<G, O, F> {
  grouper: Grouper<G, O>,
  closing_selector: MutArc<F>,
  closing: SerialSubscription,
}

impl<G, O, F> Clone for WhenShared<G, O, F> {
  fn clone(&self) -> Self {
    WhenShared {
      grouper: self.grouper.clone(),
      closing_selector: self.closing_selector.clone(),
      closing: self.closing.clone(),
    }
  }
}

impl<G, O, F> WhenShared<G, O, F> {
  /// Ask the closing selector for the closing observable of group `id`.
  fn watch<C, Err>(&self, id: usize)
  where
    F: FnMut() -> Result<C, Err> + Send + 'static,
    C: CoreObservable<Err = Err>,
    G: Group<Err> + Send + 'static,
    O: Observer<G::Output, Err> + Send + 'static,
  {
    if self.grouper.is_closed() {
      return;
    }
    let closing = {
      let mut closing_selector = self.closing_selector.rc_deref_mut();
      (*closing_selector)()
    };
    match closing {
      Ok(closing) => {
        let slot = SingleAssignmentSubscription::new();
        self.closing.set(slot.clone());
        let observer = WhenClosingObserver { shared: self.clone(), id, slot: slot.clone() };
        slot.assign(closing.actual_subscribe(observer));
      }
      Err(err) => {
        tracing::debug!("closing selector failed");
        self.grouper.finish(Terminal::Error(err));
      }
    }
  }

  fn fire<C, Err>(&self, id: usize)
  where
    F: FnMut() -> Result<C, Err> + Send + 'static,
    C: CoreObservable<Err = Err>,
    G: Group<Err> + Send + 'static,
    O: Observer<G::Output, Err> + Send + 'static,
  {
    if let Some(next) = self.grouper.rotate(Some(id)) {
      self.watch(next);
    }
  }
}

/// Observer of the closing observable of one group.
pub struct WhenClosingObserver<G, O, F> {
  shared: WhenShared<G, O, F>,
  id: usize,
  slot: SingleAssignmentSubscription,
}

impl<CItem, C, Err, G, O, F> Observer<CItem, Err> for WhenClosingObserver<G, O, F>
where
  F: FnMut() -> Result<C, Err> + Send + 'static,
  C: CoreObservable<Err = Err>,
  G: Group<Err> + Send + 'static,
  O: Observer<G::Output, Err> + Send + 'static,
{
  fn next(&mut self, _value: CItem) {
    if self.slot.is_closed() {
      return;
    }
    self.shared.fire(self.id);
  }

  fn error(self, err: Err) { self.shared.grouper.finish(Terminal::Error(err)); }

  fn complete(self) {
    if self.slot.is_closed() {
      return;
    }
    self.shared.fire(self.id);
  }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.shared.grouper.observer_closed() }
}

impl<S, C, F, K> CoreObservable for Grouped<S, When<F>, K>
where
  S: CoreObservable,
  S::Item: Clone,
  F: FnMut() -> Result<C, S::Err> + Send + 'static,
  C: CoreObservable<Err = S::Err>,
  K: GroupKind<S::Item, S::Err>,
  K::Group: Send + 'static,
{
  type Item = <K::Group as Group<S::Err>>::Output;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let grouper = Grouper::<K::Group, O>::new(observer);
    let closing = SerialSubscription::new();
    grouper.subscriptions.add(closing.clone());
    let shared =
      WhenShared { grouper: grouper.clone(), closing_selector: MutArc::own(self.trigger.0), closing };

    let first = grouper.open::<S::Err>();
    grouper.subscribe_source(self.source);
    if let Some(id) = first {
      shared.watch(id);
    }
    grouper.subscriptions
  }
}

// ==================== Toggle ====================

/// Observer of the openings observable.
pub struct ToggleOpeningObserver<G, O, F> {
  grouper: Grouper<G, O>,
  closing_selector: F,
  slot: SingleAssignmentSubscription,
}

/// Observer of the closing observable of one group.
pub struct ToggleClosingObserver<G, O> {
  grouper: Grouper<G, O>,
  id: usize,
  closing_id: usize,
}

impl<G, O> ToggleClosingObserver<G, O> {
  fn fire<Err>(&self)
  where
    G: Group<Err>,
    O: Observer<G::Output, Err>,
  {
    self.grouper.close(self.id);
    self.grouper.subscriptions.remove(self.closing_id);
  }
}

impl<OpItem, C, Err, G, O, F> Observer<OpItem, Err> for ToggleOpeningObserver<G, O, F>
where
  F: FnMut(OpItem) -> Result<C, Err>,
  C: CoreObservable<Err = Err>,
  G: Group<Err> + Send + 'static,
  O: Observer<G::Output, Err> + Send + 'static,
{
  fn next(&mut self, value: OpItem) {
    if self.slot.is_closed() || self.grouper.is_closed() {
      return;
    }
    let closing = match (self.closing_selector)(value) {
      Ok(closing) => closing,
      Err(err) => {
        tracing::debug!("closing selector failed");
        self.grouper.finish(Terminal::Error(err));
        return;
      }
    };
    let Some(id) = self.grouper.open() else {
      return;
    };
    let slot = SingleAssignmentSubscription::new();
    let Some(closing_id) = self.grouper.subscriptions.add(slot.clone()) else {
      return;
    };
    let observer = ToggleClosingObserver { grouper: self.grouper.clone(), id, closing_id };
    slot.assign(closing.actual_subscribe(observer));
  }

  fn error(self, err: Err) { self.grouper.finish(Terminal::Error(err)); }

  fn complete(self) { self.slot.unsubscribe(); }

  fn is_closed(&self) -> bool { self.slot.is_closed() || self.grouper.observer_closed() }
}

impl<CItem, Err, G, O> Observer<CItem, Err> for ToggleClosingObserver<G, O>
where
  G: Group<Err>,
  O: Observer<G::Output, Err>,
{
  fn next(&mut self, _value: CItem) { self.fire(); }

  fn error(self, err: Err) { self.grouper.finish(Terminal::Error(err)); }

  fn complete(self) { self.fire(); }

  fn is_closed(&self) -> bool { self.grouper.observer_closed() }
}

impl<S, Op, C, F, K> CoreObservable for Grouped<S, Toggle<Op, F>, K>
where
  S: CoreObservable,
  S::Item: Clone,
  Op: CoreObservable<Err = S::Err>,
  F: FnMut(Op::Item) -> Result<C, S::Err> + Send + 'static,
  C: CoreObservable<Err = S::Err>,
  K: GroupKind<S::Item, S::Err>,
  K::Group: Send + 'static,
{
  type Item = <K::Group as Group<S::Err>>::Output;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let Toggle { openings, closing_selector } = self.trigger;
    let grouper = Grouper::<K::Group, O>::new(observer);
    grouper.subscribe_source(self.source);

    let slot = SingleAssignmentSubscription::new();
    if grouper.subscriptions.add(slot.clone()).is_some() {
      let observer =
        ToggleOpeningObserver { grouper: grouper.clone(), closing_selector, slot: slot.clone() };
      slot.assign(openings.actual_subscribe(observer));
    }
    grouper.subscriptions
  }
}
