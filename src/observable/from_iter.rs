use std::marker::PhantomData;

use crate::{observable::CoreObservable, observer::Observer};

/// Creates an observable that emits every element of `iter`, then completes.
///
/// Emission stops early once the subscriber is closed.
pub fn from_iter<I, Err>(iter: I) -> FromIter<I::IntoIter, Err>
where
  I: IntoIterator,
{
  FromIter(iter.into_iter(), PhantomData)
}

/// Creates an observable from an iterator of results: `Ok` elements are
/// emitted, the first `Err` element fails the stream.
pub fn try_from_iter<I, Item, Err>(iter: I) -> TryFromIter<I::IntoIter>
where
  I: IntoIterator<Item = Result<Item, Err>>,
{
  TryFromIter(iter.into_iter())
}

#[derive(Clone)]
pub struct FromIter<I, Err>(I, PhantomData<fn() -> Err>);

#[derive(Clone)]
pub struct TryFromIter<I>(I);

impl<I, Err> CoreObservable for FromIter<I, Err>
where
  I: Iterator,
{
  type Item = I::Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, mut observer: O)
  where
    O: Observer<I::Item, Err> + Send + 'static,
  {
    for v in self.0 {
      if observer.is_closed() {
        return;
      }
      observer.next(v);
    }
    observer.complete();
  }
}

impl<I, Item, Err> CoreObservable for TryFromIter<I>
where
  I: Iterator<Item = Result<Item, Err>>,
{
  type Item = Item;
  type Err = Err;
  type Unsub = ();

  fn actual_subscribe<O>(self, mut observer: O)
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    for v in self.0 {
      if observer.is_closed() {
        return;
      }
      match v {
        Ok(v) => observer.next(v),
        Err(err) => {
          observer.error(err);
          return;
        }
      }
    }
    observer.complete();
  }
}
