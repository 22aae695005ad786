use super::{BoxedSubscription, Subscription};
use crate::rc::{MutArc, RcDeref, RcDerefMut};

#[derive(Default)]
struct SerialState {
  closed: bool,
  current: Option<BoxedSubscription>,
}

/// Holds one replaceable child subscription.
///
/// `set` releases whatever was held before; once the serial subscription is
/// released, every later `set` releases its argument immediately.
#[derive(Clone, Default)]
pub struct SerialSubscription(MutArc<SerialState>);

impl SerialSubscription {
  #[inline]
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, subscription: impl Subscription + Send + 'static) {
    let mut state = self.0.rc_deref_mut();
    if state.closed {
      drop(state);
      subscription.unsubscribe();
      return;
    }
    let previous = state.current.replace(BoxedSubscription::new(subscription));
    drop(state);
    if let Some(previous) = previous {
      previous.unsubscribe();
    }
  }
}

impl Subscription for SerialSubscription {
  fn unsubscribe(self) {
    let current = {
      let mut state = self.0.rc_deref_mut();
      if state.closed {
        return;
      }
      state.closed = true;
      state.current.take()
    };
    if let Some(current) = current {
      current.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}
