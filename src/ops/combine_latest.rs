//! CombineLatest operator implementation
//!
//! Keeps the most recent value of every source. Once each source has
//! emitted at least once, every new value from any source produces
//! `selector(latest)`.
//!
//! Completion follows two rules:
//!
//! - the stream completes when every source has completed;
//! - a source that completes without ever emitting makes a result
//!   impossible, but this is only noticed when another source emits while the
//!   operator is not ready and all other sources are done.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::{SourceSlots, Terminal},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::CompositeSubscription,
};

/// Combines the latest values of `sources` with `selector`.
#[derive(Clone)]
pub struct CombineLatest<S, F> {
  pub sources: Vec<S>,
  pub selector: F,
}

enum Latest<T> {
  /// Some source has not emitted yet; `missing` counts them.
  Filling { values: Vec<Option<T>>, missing: usize },
  Ready(Vec<T>),
}

impl<T> Latest<T> {
  fn new(len: usize) -> Self {
    Latest::Filling { values: (0..len).map(|_| None).collect(), missing: len }
  }

  /// Store `value` for source `index`; returns the full row once every
  /// source has a value.
  fn store(&mut self, index: usize, value: T) -> Option<&[T]> {
    match self {
      Latest::Ready(values) => values[index] = value,
      Latest::Filling { values, missing } => {
        if values[index].replace(value).is_none() {
          *missing -= 1;
        }
        if *missing > 0 {
          return None;
        }
        let row = std::mem::take(values).into_iter().flatten().collect();
        *self = Latest::Ready(row);
      }
    }
    match self {
      Latest::Ready(values) => Some(values),
      Latest::Filling { .. } => None,
    }
  }
}

struct CombineState<T, F, O> {
  observer: Option<O>,
  latest: Latest<T>,
  done: Vec<bool>,
  selector: F,
}

/// Observer of source `index`.
pub struct CombineLatestObserver<T, F, O> {
  index: usize,
  gate: MutArc<CombineState<T, F, O>>,
  slots: SourceSlots,
}

impl<T, F, O> CombineLatestObserver<T, F, O> {
  /// Deliver `terminal` to the observer already taken out of the gate.
  fn finish<R, Err>(&self, observer: Option<O>, terminal: Terminal<Err>)
  where
    O: Observer<R, Err>,
  {
    terminal.deliver(observer);
    self.slots.release_all();
  }
}

impl<T, R, Err, F, O> Observer<T, Err> for CombineLatestObserver<T, F, O>
where
  F: FnMut(&[T]) -> Result<R, Err>,
  O: Observer<R, Err>,
{
  fn next(&mut self, value: T) {
    if self.slots.is_closed(self.index) {
      return;
    }
    let (observer, terminal) = {
      let mut guard = self.gate.rc_deref_mut();
      let state = &mut *guard;
      let Some(observer) = state.observer.as_mut() else {
        return;
      };
      let terminal = match state.latest.store(self.index, value) {
        Some(row) => match (state.selector)(row) {
          Ok(combined) => {
            observer.next(combined);
            return;
          }
          Err(err) => Terminal::Error(err),
        },
        None => {
          let index = self.index;
          if !state.done.iter().enumerate().all(|(i, done)| i == index || *done) {
            return;
          }
          Terminal::Complete
        }
      };
      (state.observer.take(), terminal)
    };
    self.finish(observer, terminal);
  }

  fn error(self, err: Err) {
    let observer = self.gate.rc_deref_mut().observer.take();
    self.finish(observer, Terminal::Error(err));
  }

  fn complete(self) {
    let observer = {
      let mut state = self.gate.rc_deref_mut();
      state.done[self.index] = true;
      if !state.done.iter().all(|done| *done) {
        None
      } else {
        Some(state.observer.take())
      }
    };
    match observer {
      Some(observer) => self.finish(observer, Terminal::Complete),
      None => self.slots.release(self.index),
    }
  }

  fn is_closed(&self) -> bool {
    self.slots.is_closed(self.index)
      || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

impl<S, R, F> CoreObservable for CombineLatest<S, F>
where
  S: CoreObservable,
  S::Item: Send + 'static,
  F: FnMut(&[S::Item]) -> Result<R, S::Err> + Send + 'static,
{
  type Item = R;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<R, S::Err> + Send + 'static,
  {
    let len = self.sources.len();
    let slots = SourceSlots::new(len);
    if len == 0 {
      observer.complete();
      return slots.group();
    }
    let gate = MutArc::own(CombineState {
      observer: Some(observer),
      latest: Latest::new(len),
      done: vec![false; len],
      selector: self.selector,
    });
    for (index, source) in self.sources.into_iter().enumerate() {
      if slots.is_group_closed() {
        break;
      }
      let observer = CombineLatestObserver { index, gate: gate.clone(), slots: slots.clone() };
      slots.assign(index, source.actual_subscribe(observer));
    }
    slots.group()
  }
}
