use std::marker::PhantomData;

use crate::{
  observable::CoreObservable,
  observer::{BoxedEmitter, Emitter, Observer},
  subscription::Subscription,
};

/// Observable created from a function.
///
/// This struct is created by [`create`].
#[derive(Clone)]
pub struct Create<F, Item, Err> {
  f: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

/// Build an observable from a producer.
///
/// `f` runs on every subscription with an emitter bound to that subscriber
/// and returns the teardown to run when the subscriber unsubscribes. The
/// emitter may be moved to another thread to emit later.
///
/// ```rust
/// use std::convert::Infallible;
/// use rxcombine::prelude::*;
///
/// create(|mut emitter: BoxedEmitter<i32, Infallible>| {
///   emitter.next(1);
///   emitter.complete();
/// })
/// .subscribe_next(|v| println!("{v}"));
/// ```
pub fn create<F, Item, Err, U>(f: F) -> Create<F, Item, Err>
where
  F: FnOnce(BoxedEmitter<Item, Err>) -> U,
  U: Subscription + Send + 'static,
{
  Create { f, _marker: PhantomData }
}

struct CreateEmitter<O>(Option<O>);

impl<O, Item, Err> Emitter<Item, Err> for CreateEmitter<O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) {
    if let Some(observer) = &mut self.0 {
      observer.next(value);
    }
  }

  #[inline]
  fn error(&mut self, err: Err) {
    if let Some(observer) = self.0.take() {
      observer.error(err);
    }
  }

  #[inline]
  fn complete(&mut self) {
    if let Some(observer) = self.0.take() {
      observer.complete();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.as_ref().is_none_or(|o| o.is_closed()) }
}

impl<F, Item, Err, U> CoreObservable for Create<F, Item, Err>
where
  F: FnOnce(BoxedEmitter<Item, Err>) -> U,
  U: Subscription + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Item = Item;
  type Err = Err;
  type Unsub = U;

  fn actual_subscribe<O>(self, observer: O) -> U
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    (self.f)(Box::new(CreateEmitter(Some(observer))))
  }
}
