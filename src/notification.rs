//! Materialized notifications.
//!
//! A `Notification` is one observer call captured as a value. The virtual-time
//! harness records and replays them; operators use them to hand a terminal
//! event from one code path to another without calling the observer twice.

use crate::observer::Observer;

/// One of the three calls an observer can receive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

impl<Item, Err> Notification<Item, Err> {
  /// `Error` and `Completed` end a stream; nothing may follow them.
  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }

  /// Deliver this notification to `observer`.
  ///
  /// Returns the observer back for `Next`, and `None` once a terminal
  /// notification has consumed it.
  pub fn accept<O>(self, mut observer: O) -> Option<O>
  where
    O: Observer<Item, Err>,
  {
    match self {
      Notification::Next(v) => {
        observer.next(v);
        Some(observer)
      }
      Notification::Error(e) => {
        observer.error(e);
        None
      }
      Notification::Completed => {
        observer.complete();
        None
      }
    }
  }

  pub fn map<U>(self, f: impl FnOnce(Item) -> U) -> Notification<U, Err> {
    match self {
      Notification::Next(v) => Notification::Next(f(v)),
      Notification::Error(e) => Notification::Error(e),
      Notification::Completed => Notification::Completed,
    }
  }

  pub fn as_ref(&self) -> Notification<&Item, &Err> {
    match self {
      Notification::Next(v) => Notification::Next(v),
      Notification::Error(e) => Notification::Error(e),
      Notification::Completed => Notification::Completed,
    }
  }
}
