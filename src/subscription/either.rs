use super::Subscription;

/// Subscription to whichever of two source types was subscribed.
///
/// Produced when an operator moves from one source type to another, such as
/// `catch` switching from the failed source to the handler's replacement.
pub enum EitherSubscription<A, B> {
  Left(A),
  Right(B),
}

impl<A, B> Subscription for EitherSubscription<A, B>
where
  A: Subscription,
  B: Subscription,
{
  fn unsubscribe(self) {
    match self {
      Self::Left(s) => s.unsubscribe(),
      Self::Right(s) => s.unsubscribe(),
    }
  }

  fn is_closed(&self) -> bool {
    match self {
      Self::Left(s) => s.is_closed(),
      Self::Right(s) => s.is_closed(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  };

  use super::*;
  use crate::subscription::ClosureSubscription;

  #[rxcombine_macro::test]
  fn delegates_to_active_side() {
    let released = Arc::new(AtomicBool::new(false));
    let r = released.clone();
    let right: EitherSubscription<(), _> =
      EitherSubscription::Right(ClosureSubscription::new(move || r.store(true, Ordering::SeqCst)));
    assert!(!right.is_closed());
    right.unsubscribe();
    assert!(released.load(Ordering::SeqCst));

    let left: EitherSubscription<(), ClosureSubscription<fn()>> = EitherSubscription::Left(());
    assert!(left.is_closed());
  }
}
