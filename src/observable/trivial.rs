use std::marker::PhantomData;

use crate::{observable::CoreObservable, observer::Observer};

/// Completes immediately without emitting anything.
pub fn empty<Item, Err>() -> Empty<Item, Err> { Empty(PhantomData) }

/// Never emits and never terminates.
pub fn never<Item, Err>() -> Never<Item, Err> { Never(PhantomData) }

/// Fails immediately with `err`.
pub fn throw_err<Item, Err>(err: Err) -> ThrowErr<Item, Err> { ThrowErr(err, PhantomData) }

#[derive(Clone)]
pub struct Empty<Item, Err>(PhantomData<fn() -> (Item, Err)>);

#[derive(Clone)]
pub struct Never<Item, Err>(PhantomData<fn() -> (Item, Err)>);

#[derive(Clone)]
pub struct ThrowErr<Item, Err>(Err, PhantomData<fn() -> Item>);

impl<Item, Err> CoreObservable for Empty<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, observer: O)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    observer.complete();
  }
}

impl<Item, Err> CoreObservable for Never<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, _observer: O)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
  }
}

impl<Item, Err> CoreObservable for ThrowErr<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, observer: O)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    observer.error(self.0);
  }
}
