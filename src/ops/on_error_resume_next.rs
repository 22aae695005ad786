//! OnErrorResumeNext operator implementation
//!
//! Walks a sequence of sources, moving on whenever the current one
//! terminates, whether it completed or failed. Only the last source's own
//! terminal reaches the observer.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::sequence::{pull, subscribe_sequence, Step, Successor},
  subscription::SerialSubscription,
};

#[derive(Clone)]
pub struct OnErrorResumeNext<I> {
  pub sources: I,
}

struct ResumeSuccessor<I>(I);

impl<I, S> Successor for ResumeSuccessor<I>
where
  I: Iterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  type Source = S;

  fn first(&mut self) -> Step<S> { self.on_complete() }

  fn on_complete(&mut self) -> Step<S> { pull(&mut self.0).unwrap_or(Step::Complete) }

  fn on_error(&mut self, err: S::Err) -> Step<S> {
    let next = pull(&mut self.0);
    if next.is_some() {
      tracing::trace!("on_error_resume_next dropped an error");
    }
    next.unwrap_or(Step::Error(err))
  }
}

impl<I, S> CoreObservable for OnErrorResumeNext<I>
where
  I: Iterator<Item = Result<S, S::Err>> + Send + 'static,
  S: CoreObservable + Send + 'static,
  S::Err: Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = SerialSubscription;

  fn actual_subscribe<O>(self, observer: O) -> SerialSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    subscribe_sequence(ResumeSuccessor(self.sources), observer)
  }
}
