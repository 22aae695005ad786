use super::{BoxedSubscription, Subscription};
use crate::{
  error::SubscriptionError,
  rc::{MutArc, RcDeref, RcDerefMut},
};

#[derive(Default)]
enum Slot {
  #[default]
  Empty,
  Assigned(BoxedSubscription),
  Released,
}

/// A slot that accepts exactly one subscription.
///
/// Operators register the slot with their group *before* subscribing to an
/// upstream, then fill it with the returned handle. If the group was released
/// in between, the handle is released as soon as it arrives.
#[derive(Clone, Default)]
pub struct SingleAssignmentSubscription(MutArc<Slot>);

impl SingleAssignmentSubscription {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Fill the slot.
  ///
  /// A second assignment is rejected with
  /// [`SubscriptionError::AlreadyAssigned`] and the rejected subscription is
  /// released.
  pub fn set(
    &self, subscription: impl Subscription + Send + 'static,
  ) -> Result<(), SubscriptionError> {
    let mut slot = self.0.rc_deref_mut();
    match &*slot {
      Slot::Empty => {
        *slot = Slot::Assigned(BoxedSubscription::new(subscription));
        Ok(())
      }
      Slot::Released => {
        drop(slot);
        subscription.unsubscribe();
        Ok(())
      }
      Slot::Assigned(_) => {
        drop(slot);
        subscription.unsubscribe();
        Err(SubscriptionError::AlreadyAssigned)
      }
    }
  }

  /// `set`, logging instead of returning a double assignment.
  pub(crate) fn assign(&self, subscription: impl Subscription + Send + 'static) {
    if let Err(err) = self.set(subscription) {
      tracing::warn!(%err, "subscription slot assigned twice");
    }
  }
}

impl Subscription for SingleAssignmentSubscription {
  fn unsubscribe(self) {
    let previous = std::mem::replace(&mut *self.0.rc_deref_mut(), Slot::Released);
    if let Slot::Assigned(subscription) = previous {
      subscription.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { matches!(*self.0.rc_deref(), Slot::Released) }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;
  use crate::subscription::ClosureSubscription;

  fn counter(count: &Arc<AtomicUsize>) -> impl Subscription + Send + 'static {
    let c = count.clone();
    ClosureSubscription::new(move || {
      c.fetch_add(1, Ordering::SeqCst);
    })
  }

  #[rxcombine_macro::test]
  fn second_assignment_rejected() {
    let count = Arc::new(AtomicUsize::new(0));
    let slot = SingleAssignmentSubscription::new();
    assert_eq!(slot.set(counter(&count)), Ok(()));
    assert_eq!(slot.set(counter(&count)), Err(SubscriptionError::AlreadyAssigned));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    slot.clone().unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(slot.is_closed());
  }

  #[rxcombine_macro::test]
  fn assignment_after_release() {
    let count = Arc::new(AtomicUsize::new(0));
    let slot = SingleAssignmentSubscription::new();
    slot.clone().unsubscribe();
    assert_eq!(slot.set(counter(&count)), Ok(()));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    slot.unsubscribe();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
