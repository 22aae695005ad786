//! Operators.
//!
//! Every multi-source operator follows the same shape: per-subscription state
//! sits behind one `MutArc` gate together with the downstream observer, and
//! every upstream subscription is held by a subscription container that the
//! operator returns as its `Unsub`.

use std::sync::Arc;

use crate::{
  observer::Observer,
  subscription::{CompositeSubscription, SingleAssignmentSubscription, Subscription},
};

pub mod amb;
pub mod buffer;
pub mod catch;
pub mod combine_latest;
pub mod concat;
mod groups;
pub mod map;
pub mod merge;
pub mod on_error_resume_next;
pub(crate) mod sequence;
pub mod skip_until;
pub mod switch_on_next;
pub mod take_until;
pub mod window;
pub mod zip;

/// A terminal decided while holding a gate, delivered once it is released.
pub(crate) enum Terminal<Err> {
  Complete,
  Error(Err),
}

impl<Err> Terminal<Err> {
  pub(crate) fn deliver<Item, O>(self, observer: Option<O>)
  where
    O: Observer<Item, Err>,
  {
    match (self, observer) {
      (Terminal::Complete, Some(observer)) => observer.complete(),
      (Terminal::Error(err), Some(observer)) => observer.error(err),
      (_, None) => {}
    }
  }
}

/// One subscription slot per source of an operator with a fixed source list,
/// all owned by the group returned to the subscriber.
#[derive(Clone)]
pub(crate) struct SourceSlots {
  slots: Arc<[SingleAssignmentSubscription]>,
  group: CompositeSubscription,
}

impl SourceSlots {
  pub(crate) fn new(len: usize) -> Self {
    let slots: Arc<[SingleAssignmentSubscription]> =
      (0..len).map(|_| SingleAssignmentSubscription::new()).collect();
    let group = CompositeSubscription::new();
    for slot in slots.iter() {
      group.add(slot.clone());
    }
    SourceSlots { slots, group }
  }

  pub(crate) fn len(&self) -> usize { self.slots.len() }

  pub(crate) fn group(&self) -> CompositeSubscription { self.group.clone() }

  pub(crate) fn assign(&self, index: usize, subscription: impl Subscription + Send + 'static) {
    self.slots[index].assign(subscription);
  }

  /// Release the subscription of source `index` only.
  pub(crate) fn release(&self, index: usize) { self.slots[index].clone().unsubscribe(); }

  /// Whether source `index` should stop emitting.
  pub(crate) fn is_closed(&self, index: usize) -> bool {
    self.group.is_closed() || self.slots[index].is_closed()
  }

  pub(crate) fn is_group_closed(&self) -> bool { self.group.is_closed() }

  /// Release every source.
  pub(crate) fn release_all(&self) { self.group.clone().unsubscribe(); }
}
