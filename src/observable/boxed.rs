//! Boxed Observable types and traits for type erasure
//!
//! N-ary operators are homogeneous over one source type. Sources of
//! different concrete types are unified by boxing them into
//! [`BoxedObservable`].

use crate::{
  observable::CoreObservable,
  observer::{BoxedObserver, Observer},
  subscription::BoxedSubscription,
};

/// Object-safe observable trait for type erasure.
pub trait DynCoreObservable<Item, Err>: Send {
  fn dyn_subscribe(self: Box<Self>, observer: BoxedObserver<Item, Err>) -> BoxedSubscription;
}

impl<S> DynCoreObservable<S::Item, S::Err> for S
where
  S: CoreObservable + Send,
  S::Item: 'static,
  S::Err: 'static,
{
  fn dyn_subscribe(
    self: Box<Self>, observer: BoxedObserver<S::Item, S::Err>,
  ) -> BoxedSubscription {
    BoxedSubscription::new((*self).actual_subscribe(observer))
  }
}

/// A type-erased, sendable observable.
pub struct BoxedObservable<Item, Err>(Box<dyn DynCoreObservable<Item, Err>>);

impl<Item, Err> BoxedObservable<Item, Err> {
  pub fn new(source: impl DynCoreObservable<Item, Err> + 'static) -> Self {
    BoxedObservable(Box::new(source))
  }
}

impl<Item: 'static, Err: 'static> CoreObservable for BoxedObservable<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = BoxedSubscription;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.0.dyn_subscribe(Box::new(observer))
  }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn heterogeneous_sources_in_one_vec() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    let sources: Vec<BoxedObservable<i32, Infallible>> =
      vec![of(1).box_it(), from_iter(2..4).box_it(), of(4).map(|v| v * 10).box_it()];
    factory::concat(sources).subscribe_next(move |v| s.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 40]);
  }
}
