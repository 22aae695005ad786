use super::{BoxedSubscription, DynamicSubscriptions, Subscription};
use crate::rc::{MutArc, RcDeref, RcDerefMut};

#[derive(Default)]
struct CompositeState {
  closed: bool,
  children: DynamicSubscriptions<BoxedSubscription>,
}

/// A thread-safe group of child subscriptions released together.
///
/// - A child added after the group has been released is released on the
///   spot and `add` returns `None`.
/// - Children are released outside the internal lock, so a child may call
///   back into the group while being torn down.
#[derive(Clone, Default)]
pub struct CompositeSubscription(MutArc<CompositeState>);

impl CompositeSubscription {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Track `subscription`, returning the id to `remove` it with later.
  pub fn add(&self, subscription: impl Subscription + Send + 'static) -> Option<usize> {
    let mut state = self.0.rc_deref_mut();
    if state.closed {
      drop(state);
      subscription.unsubscribe();
      None
    } else {
      Some(state.children.add(BoxedSubscription::new(subscription)))
    }
  }

  /// Stop tracking child `id` and release it.
  pub fn remove(&self, id: usize) {
    let child = self.0.rc_deref_mut().children.remove(id);
    if let Some(child) = child {
      child.unsubscribe();
    }
  }

  /// Number of live children.
  pub fn len(&self) -> usize { self.0.rc_deref().children.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Subscription for CompositeSubscription {
  fn unsubscribe(self) {
    let children = {
      let mut state = self.0.rc_deref_mut();
      if state.closed {
        return;
      }
      state.closed = true;
      state.children.take_all()
    };
    for child in children {
      child.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}
