use std::marker::PhantomData;

use crate::{observable::CoreObservable, observer::Observer};

/// Creates an observable producing a single value.
///
/// Completes immediately after emitting the value given. Never emits an
/// error; the error type is chosen by the caller.
///
/// ```rust
/// use std::convert::Infallible;
/// use rxcombine::prelude::*;
///
/// of::<_, Infallible>(123).subscribe_next(|v| println!("{v}"));
/// ```
pub fn of<Item, Err>(v: Item) -> Of<Item, Err> { Of(v, PhantomData) }

#[derive(Clone)]
pub struct Of<Item, Err>(Item, PhantomData<fn() -> Err>);

impl<Item, Err> CoreObservable for Of<Item, Err> {
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, mut observer: O)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    if !observer.is_closed() {
      observer.next(self.0);
      observer.complete();
    }
  }
}
