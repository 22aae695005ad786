//! Observable traits and source factories.
//!
//! [`CoreObservable`] is the subscription contract every source and operator
//! implements. [`Observable`] is the user-facing surface: it is implemented
//! for every `CoreObservable` and carries the subscribe helpers and all
//! combinator methods.

use std::convert::Infallible;

use crate::{
  factory,
  observer::{FnMutObserver, Observer, ObserverAll},
  ops::{
    amb::Amb,
    buffer::{Buffer, BufferToggle, BufferWhen},
    catch::Catch,
    combine_latest::CombineLatest,
    concat::Concat,
    map::Map,
    merge::MergeAll,
    on_error_resume_next::OnErrorResumeNext,
    skip_until::SkipUntil,
    switch_on_next::SwitchOnNext,
    take_until::TakeUntil,
    window::{Window, WindowToggle, WindowWhen},
    zip::{Zip, ZipIter},
  },
  scheduler::{Duration, Scheduler},
  subscription::{Subscription, SubscriptionWrapper},
};

mod boxed;
mod create;
mod from_iter;
mod interval;
mod of;
mod timer;
mod trivial;

pub use boxed::*;
pub use create::*;
pub use from_iter::*;
pub use interval::*;
pub use of::*;
pub use timer::*;
pub use trivial::*;

/// Sources produced by `factory::concat` and friends from an infallible
/// iterator of observables.
pub type OkSources<I> = std::iter::Map<
  I,
  fn(
    <I as Iterator>::Item,
  ) -> Result<<I as Iterator>::Item, <<I as Iterator>::Item as CoreObservable>::Err>,
>;

/// The subscription contract.
///
/// Subscribing consumes the observable. Observables that can be subscribed
/// more than once implement `Clone`.
pub trait CoreObservable {
  type Item;
  type Err;
  /// Handle returned by `actual_subscribe`.
  type Unsub: Subscription + Send + 'static;

  fn actual_subscribe<O>(self, observer: O) -> Self::Unsub
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;
}

/// Operator surface available on every [`CoreObservable`].
pub trait Observable: CoreObservable + Sized {
  /// Subscribe an observer.
  fn subscribe<O>(self, observer: O) -> SubscriptionWrapper<Self::Unsub>
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    SubscriptionWrapper(self.actual_subscribe(observer))
  }

  /// Subscribe one closure per notification kind.
  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> SubscriptionWrapper<Self::Unsub>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.subscribe(ObserverAll::new(next, error, complete))
  }

  /// Subscribe to the values of a stream that cannot fail.
  fn subscribe_next<N>(self, next: N) -> SubscriptionWrapper<Self::Unsub>
  where
    Self: CoreObservable<Err = Infallible>,
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe(FnMutObserver(next))
  }

  /// Erase the concrete type, e.g. to put different sources in one `Vec`.
  fn box_it(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    BoxedObservable::new(self)
  }

  fn map<B, F>(self, f: F) -> Map<Self, F>
  where
    F: FnMut(Self::Item) -> B,
  {
    Map { source: self, func: f }
  }

  /// Mirror whichever of `self` and `other` notifies first.
  fn amb(self, other: Self) -> Amb<Self> { factory::amb([self, other]) }

  /// On error, continue with the observable returned by `handler`.
  ///
  /// A handler returning `Err` replaces the original error.
  fn catch<S2, F>(self, handler: F) -> Catch<Self, fn(&Self::Err) -> bool, F>
  where
    F: FnOnce(Self::Err) -> Result<S2, Self::Err>,
  {
    Catch::new(self, catch_all as fn(&Self::Err) -> bool, handler)
  }

  /// Like `catch`, but only errors matching `predicate` are handled; others
  /// terminate the stream unchanged.
  fn catch_when<P, S2, F>(self, predicate: P, handler: F) -> Catch<Self, P, F>
  where
    P: FnMut(&Self::Err) -> bool,
    F: FnOnce(Self::Err) -> Result<S2, Self::Err>,
  {
    Catch::new(self, predicate, handler)
  }

  /// Emit `self`, then `other` once `self` completes.
  fn concat(self, other: Self) -> Concat<OkSources<std::array::IntoIter<Self, 2>>> {
    factory::concat([self, other])
  }

  /// Interleave `self` and `other`.
  fn merge(self, other: Self) -> MergeAll<FromIter<std::array::IntoIter<Self, 2>, Self::Err>> {
    factory::merge([self, other])
  }

  /// Flatten an observable of observables, running at most `max_concurrent`
  /// inner observables at once. Later inners wait in arrival order.
  fn merge_all(self, max_concurrent: usize) -> MergeAll<Self>
  where
    Self::Item: CoreObservable<Err = Self::Err>,
  {
    MergeAll::new(self, max_concurrent)
  }

  /// Flatten an observable of observables one inner at a time.
  fn concat_all(self) -> MergeAll<Self>
  where
    Self::Item: CoreObservable<Err = Self::Err>,
  {
    MergeAll::new(self, 1)
  }

  /// Continue with `other` whether `self` completes or fails.
  fn on_error_resume_next(
    self, other: Self,
  ) -> OnErrorResumeNext<OkSources<std::array::IntoIter<Self, 2>>> {
    factory::on_error_resume_next([self, other])
  }

  /// Drop values until `other` emits its first value.
  fn skip_until<N>(self, other: N) -> SkipUntil<Self, N>
  where
    N: CoreObservable<Err = Self::Err>,
  {
    SkipUntil { source: self, other }
  }

  /// Forward values until `other` emits a value or fails.
  fn take_until<N>(self, other: N) -> TakeUntil<Self, N>
  where
    N: CoreObservable<Err = Self::Err>,
  {
    TakeUntil { source: self, other }
  }

  /// Flatten an observable of observables, always listening to the latest
  /// inner only.
  fn switch_on_next(self) -> SwitchOnNext<Self>
  where
    Self::Item: CoreObservable<Err = Self::Err>,
  {
    SwitchOnNext { source: self }
  }

  /// Pair the n-th value of `self` with the n-th value of `other`.
  #[allow(clippy::type_complexity)]
  fn zip(
    self, other: Self,
  ) -> Zip<Self, fn(Vec<Self::Item>) -> Result<(Self::Item, Self::Item), Self::Err>> {
    factory::zip([self, other], pair as fn(Vec<Self::Item>) -> Result<(Self::Item, Self::Item), Self::Err>)
  }

  /// Pair each value with the next element pulled from `iter`.
  ///
  /// An `Err` element fails the stream; an exhausted iterator completes it.
  fn zip_iter<I, U, R, F>(self, iter: I, selector: F) -> ZipIter<Self, I::IntoIter, F>
  where
    I: IntoIterator<Item = Result<U, Self::Err>>,
    F: FnMut(Self::Item, U) -> Result<R, Self::Err>,
  {
    ZipIter { source: self, iter: iter.into_iter(), selector }
  }

  /// Combine the latest values of `self` and `other` whenever either emits.
  fn combine_latest<R, F>(self, other: Self, selector: F) -> CombineLatest<Self, F>
  where
    F: FnMut(&[Self::Item]) -> Result<R, Self::Err>,
  {
    factory::combine_latest([self, other], selector)
  }

  /// Collect values into lists, emitting and restarting the list each time
  /// `boundary` emits.
  fn buffer<B>(self, boundary: B) -> Buffer<Self, B>
  where
    B: CoreObservable<Err = Self::Err>,
  {
    Buffer::new(self, boundary)
  }

  /// Collect values into lists; each list closes when the observable made by
  /// `closing_selector` for it first notifies.
  fn buffer_when<C, F>(self, closing_selector: F) -> BufferWhen<Self, F>
  where
    F: FnMut() -> Result<C, Self::Err>,
    C: CoreObservable<Err = Self::Err>,
  {
    BufferWhen::new(self, closing_selector)
  }

  /// Open a list on every value of `openings`; each list closes when the
  /// observable made for it by `closing_selector` first notifies. Lists may
  /// overlap.
  fn buffer_toggle<Op, C, F>(self, openings: Op, closing_selector: F) -> BufferToggle<Self, Op, F>
  where
    Op: CoreObservable<Err = Self::Err>,
    F: FnMut(Op::Item) -> Result<C, Self::Err>,
    C: CoreObservable<Err = Self::Err>,
  {
    BufferToggle::new(self, openings, closing_selector)
  }

  /// Emit the values collected during each `span` of `scheduler` time.
  fn buffer_with_time<Sch>(
    self, span: Duration, scheduler: Sch,
  ) -> Buffer<Self, Interval<Sch, Self::Err>>
  where
    Sch: Scheduler,
  {
    self.buffer(interval(span, scheduler))
  }

  /// Split the stream into nested windows, starting a new window each time
  /// `boundary` emits. Each window is emitted when it opens.
  fn window<B>(self, boundary: B) -> Window<Self, B>
  where
    B: CoreObservable<Err = Self::Err>,
  {
    Window::new(self, boundary)
  }

  fn window_when<C, F>(self, closing_selector: F) -> WindowWhen<Self, F>
  where
    F: FnMut() -> Result<C, Self::Err>,
    C: CoreObservable<Err = Self::Err>,
  {
    WindowWhen::new(self, closing_selector)
  }

  fn window_toggle<Op, C, F>(self, openings: Op, closing_selector: F) -> WindowToggle<Self, Op, F>
  where
    Op: CoreObservable<Err = Self::Err>,
    F: FnMut(Op::Item) -> Result<C, Self::Err>,
    C: CoreObservable<Err = Self::Err>,
  {
    WindowToggle::new(self, openings, closing_selector)
  }

  fn window_with_time<Sch>(
    self, span: Duration, scheduler: Sch,
  ) -> Window<Self, Interval<Sch, Self::Err>>
  where
    Sch: Scheduler,
  {
    self.window(interval(span, scheduler))
  }
}

impl<T: CoreObservable> Observable for T {}

fn catch_all<Err>(_: &Err) -> bool { true }

fn pair<T, Err>(values: Vec<T>) -> Result<(T, T), Err> {
  let mut values = values.into_iter();
  match (values.next(), values.next()) {
    (Some(a), Some(b)) => Ok((a, b)),
    _ => unreachable!("zip of two sources always yields two values"),
  }
}
