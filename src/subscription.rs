//! Subscription handles.
//!
//! A subscription is the one-shot release handle returned by
//! `actual_subscribe`. Shared containers (`CompositeSubscription`,
//! `SerialSubscription`, `SingleAssignmentSubscription`) are cheap clones of
//! one cell, so any clone may release the whole group.

mod boxed;
mod composite;
mod dynamic;
mod either;
mod serial;
mod single_assignment;

pub use boxed::*;
pub use composite::*;
pub use dynamic::*;
pub use either::*;
pub use serial::*;
pub use single_assignment::*;

/// Subscription returned from `Observable::subscribe` to allow unsubscribing.
pub trait Subscription {
  /// Stop receiving notifications and release every upstream resource.
  ///
  /// Idempotent: a handle that is already closed ignores the call.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;
}

/// The unit subscription has nothing to release and is always closed.
impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<T: Subscription> Subscription for Option<T> {
  #[inline]
  fn unsubscribe(self) {
    if let Some(inner) = self {
      inner.unsubscribe()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().is_none_or(Subscription::is_closed) }
}

/// Runs a closure on unsubscribe.
pub struct ClosureSubscription<F>(F);

impl<F: FnOnce()> ClosureSubscription<F> {
  #[inline]
  pub fn new(teardown: F) -> Self { Self(teardown) }
}

impl<F: FnOnce()> Subscription for ClosureSubscription<F> {
  #[inline]
  fn unsubscribe(self) { (self.0)() }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Wrapper around a subscription which provides the
/// `unsubscribe_when_dropped()` method.
pub struct SubscriptionWrapper<T: Subscription>(pub(crate) T);

impl<T: Subscription> SubscriptionWrapper<T> {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard::new(self.0) }

  /// Consumes this wrapper and returns the underlying subscription.
  pub fn into_inner(self) -> T { self.0 }
}

impl<T: Subscription> Subscription for SubscriptionWrapper<T> {
  #[inline]
  fn unsubscribe(self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(Some(subscription)) }

  /// Give up RAII behavior and hand the subscription back.
  pub fn disarm(mut self) -> Option<T> { self.0.take() }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe()
    }
  }
}
