//! Window operator implementation
//!
//! Like Buffer, but each group is a nested [`WindowStream`] emitted the
//! moment it opens. Values are pushed into every open window as they arrive,
//! closing a window completes its stream, and an error of the outer stream
//! reaches every open window before the subscriber.
//!
//! A window does not replay values. Subscribe to it when it is emitted to see
//! all of them; a late subscriber still receives its terminal notification.

use super::groups::{Boundary, Group, GroupKind, Grouped, Toggle, When};
pub use crate::subject::SubjectSubscription;
use crate::{observable::CoreObservable, observer::Observer, subject::Subject};

/// One window of values.
pub struct WindowStream<Item, Err>(Subject<Item, Err>);

impl<Item, Err> Clone for WindowStream<Item, Err> {
  fn clone(&self) -> Self { WindowStream(self.0.clone()) }
}

impl<Item, Err> CoreObservable for WindowStream<Item, Err>
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
    self.0.subscribe(observer)
  }
}

impl<Item: Clone, Err: Clone> Group<Err> for WindowStream<Item, Err> {
  type Item = Item;
  type Output = WindowStream<Item, Err>;

  fn open() -> (Self, Option<Self>) {
    let window = WindowStream(Subject::new());
    (window.clone(), Some(window))
  }

  fn push(&mut self, value: Item) { self.0.next(value); }

  fn close(self) -> Option<Self> {
    self.0.complete();
    None
  }

  fn fail(self, err: &Err) { self.0.error(err.clone()); }
}

/// Selects `WindowStream` groups emitted at open.
pub struct WindowKind;

impl<Item: Clone, Err: Clone> GroupKind<Item, Err> for WindowKind {
  type Group = WindowStream<Item, Err>;
}

/// Windows rotated each time a boundary observable emits.
pub type Window<S, B> = Grouped<S, Boundary<B>, WindowKind>;

/// Windows closed by a fresh closing observable per window.
pub type WindowWhen<S, F> = Grouped<S, When<F>, WindowKind>;

/// Possibly overlapping windows opened by an openings observable.
pub type WindowToggle<S, Op, F> = Grouped<S, Toggle<Op, F>, WindowKind>;
