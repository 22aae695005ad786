//! Map operator implementation
//!
//! Single-source projection used to shape the inputs and outputs of the
//! multi-source operators.

use crate::{observable::CoreObservable, observer::Observer};

/// Applies `func` to every value of `source`.
#[derive(Clone)]
pub struct Map<S, F> {
  pub source: S,
  pub func: F,
}

/// Observer that projects each value before forwarding it.
pub struct MapObserver<O, F> {
  observer: O,
  func: F,
}

impl<S, F, B> CoreObservable for Map<S, F>
where
  S: CoreObservable,
  F: FnMut(S::Item) -> B + Send + 'static,
{
  type Item = B;
  type Err = S::Err;
  type Unsub = S::Unsub;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(MapObserver { observer, func: self.func })
  }
}

impl<Item, Err, O, F, B> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next((self.func)(value)) }

  #[inline]
  fn error(self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(self) { self.observer.complete() }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn primitive_type() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    from_iter::<_, ()>(100..103)
      .map(|v| v * 2)
      .subscribe_all(move |v| s.lock().unwrap().push(v), |_| {}, || {});
    assert_eq!(*seen.lock().unwrap(), vec![200, 202, 204]);
  }

  #[rxcombine_macro::test]
  fn map_types_mixed() {
    let seen = Arc::new(Mutex::new(String::new()));
    let s = seen.clone();
    from_iter::<_, ()>(['a', 'b', 'c'])
      .map(|c| c.to_ascii_uppercase())
      .map(|c| c.to_string())
      .subscribe_all(move |v| s.lock().unwrap().push_str(&v), |_| {}, || {});
    assert_eq!(*seen.lock().unwrap(), "ABC");
  }
}
