//! N-ary constructors.
//!
//! The methods on [`Observable`](crate::observable::Observable) cover the
//! two-source forms. The functions here take any number of sources of one
//! type; sources of different types are unified with `box_it()` first.
//!
//! ```rust
//! use rxcombine::prelude::*;
//!
//! let sums = factory::combine_latest(
//!   vec![from_iter::<_, ()>(vec![1, 2]), from_iter(vec![10]), from_iter(vec![100])],
//!   |latest: &[i32]| Ok(latest.iter().sum::<i32>()),
//! );
//! sums.subscribe_all(|v| println!("{v}"), |_| {}, || {});
//! ```
//!
//! The `try_*` forms accept an iterator of `Result`s: an `Err` element fails
//! the stream at the moment it is pulled.

use crate::{
  observable::{from_iter, try_from_iter, CoreObservable, FromIter, OkSources, TryFromIter},
  ops::{
    amb::Amb,
    catch::CatchSequence,
    combine_latest::CombineLatest,
    concat::Concat,
    merge::MergeAll,
    on_error_resume_next::OnErrorResumeNext,
    zip::Zip,
  },
};

fn ok_sources<I>(sources: I) -> OkSources<I::IntoIter>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  sources.into_iter().map(Ok as fn(I::Item) -> Result<I::Item, <I::Item as CoreObservable>::Err>)
}

/// Mirror whichever source notifies first; the others are released.
pub fn amb<I>(sources: I) -> Amb<I::Item>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  Amb { sources: sources.into_iter().collect() }
}

/// Move on to the next source each time one fails; the error of the last
/// source is forwarded.
pub fn catch<I>(sources: I) -> CatchSequence<OkSources<I::IntoIter>>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  CatchSequence { sources: ok_sources(sources) }
}

pub fn try_catch<I, S>(sources: I) -> CatchSequence<I::IntoIter>
where
  I: IntoIterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  CatchSequence { sources: sources.into_iter() }
}

/// Emit the latest value of every source each time one of them emits, once
/// all of them have emitted at least once.
pub fn combine_latest<I, R, F>(sources: I, selector: F) -> CombineLatest<I::Item, F>
where
  I: IntoIterator,
  I::Item: CoreObservable,
  F: FnMut(&[<I::Item as CoreObservable>::Item]) -> Result<R, <I::Item as CoreObservable>::Err>,
{
  CombineLatest { sources: sources.into_iter().collect(), selector }
}

/// Subscribe to each source after the previous one completes.
pub fn concat<I>(sources: I) -> Concat<OkSources<I::IntoIter>>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  Concat { sources: ok_sources(sources) }
}

pub fn try_concat<I, S>(sources: I) -> Concat<I::IntoIter>
where
  I: IntoIterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  Concat { sources: sources.into_iter() }
}

/// Subscribe to every source at once and interleave their values.
pub fn merge<I>(sources: I) -> MergeAll<FromIter<I::IntoIter, <I::Item as CoreObservable>::Err>>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  MergeAll::new(from_iter(sources), usize::MAX)
}

/// Like `merge`, with at most `max_concurrent` sources subscribed at a time.
/// The rest wait in order.
pub fn merge_with_concurrency<I>(
  sources: I, max_concurrent: usize,
) -> MergeAll<FromIter<I::IntoIter, <I::Item as CoreObservable>::Err>>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  MergeAll::new(from_iter(sources), max_concurrent)
}

pub fn try_merge<I, S>(sources: I) -> MergeAll<TryFromIter<I::IntoIter>>
where
  I: IntoIterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  MergeAll::new(try_from_iter(sources), usize::MAX)
}

/// Move on to the next source whenever one terminates, successfully or not.
pub fn on_error_resume_next<I>(sources: I) -> OnErrorResumeNext<OkSources<I::IntoIter>>
where
  I: IntoIterator,
  I::Item: CoreObservable,
{
  OnErrorResumeNext { sources: ok_sources(sources) }
}

pub fn try_on_error_resume_next<I, S>(sources: I) -> OnErrorResumeNext<I::IntoIter>
where
  I: IntoIterator<Item = Result<S, S::Err>>,
  S: CoreObservable,
{
  OnErrorResumeNext { sources: sources.into_iter() }
}

/// Pair the values of all sources by position.
pub fn zip<I, R, F>(sources: I, selector: F) -> Zip<I::Item, F>
where
  I: IntoIterator,
  I::Item: CoreObservable,
  F: FnMut(Vec<<I::Item as CoreObservable>::Item>) -> Result<R, <I::Item as CoreObservable>::Err>,
{
  Zip { sources: sources.into_iter().collect(), selector }
}
