//! Amb operator implementation
//!
//! Races the sources: the first one to deliver any notification wins, every
//! other source is released at that instant, and from then on only the
//! winner is mirrored.

use crate::{
  observable::CoreObservable,
  observer::Observer,
  ops::SourceSlots,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::CompositeSubscription,
};

/// Mirrors whichever of `sources` notifies first.
///
/// With no sources the stream never notifies.
#[derive(Clone)]
pub struct Amb<S> {
  pub sources: Vec<S>,
}

struct AmbState<O> {
  observer: Option<O>,
  winner: Option<usize>,
}

/// Observer of one contender.
pub struct AmbObserver<O> {
  index: usize,
  gate: MutArc<AmbState<O>>,
  slots: SourceSlots,
}

enum Claim {
  Lost,
  Won,
  Elected,
}

impl<O> AmbObserver<O> {
  fn claim(state: &mut AmbState<O>, index: usize) -> Claim {
    match state.winner {
      None => {
        state.winner = Some(index);
        Claim::Elected
      }
      Some(winner) if winner == index => Claim::Won,
      Some(_) => Claim::Lost,
    }
  }

  fn release_losers(&self) {
    tracing::debug!(winner = self.index, contenders = self.slots.len(), "amb elected a winner");
    for index in (0..self.slots.len()).filter(|&i| i != self.index) {
      self.slots.release(index);
    }
  }

  fn terminate(self, deliver: impl FnOnce(O)) {
    let observer = {
      let mut state = self.gate.rc_deref_mut();
      match Self::claim(&mut state, self.index) {
        Claim::Lost => return,
        Claim::Elected => tracing::debug!(winner = self.index, "amb winner terminated first"),
        Claim::Won => {}
      }
      state.observer.take()
    };
    if let Some(observer) = observer {
      deliver(observer);
    }
    self.slots.release_all();
  }
}

impl<Item, Err, O> Observer<Item, Err> for AmbObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.slots.is_closed(self.index) {
      return;
    }
    let claim = {
      let mut state = self.gate.rc_deref_mut();
      let claim = Self::claim(&mut state, self.index);
      if !matches!(claim, Claim::Lost) {
        if let Some(observer) = state.observer.as_mut() {
          observer.next(value);
        }
      }
      claim
    };
    if matches!(claim, Claim::Elected) {
      self.release_losers();
    }
  }

  fn error(self, err: Err) { self.terminate(|observer| observer.error(err)); }

  fn complete(self) { self.terminate(|observer| observer.complete()); }

  fn is_closed(&self) -> bool {
    self.slots.is_closed(self.index)
      || self.gate.rc_deref().observer.as_ref().is_none_or(|o| o.is_closed())
  }
}

impl<S> CoreObservable for Amb<S>
where
  S: CoreObservable,
{
  type Item = S::Item;
  type Err = S::Err;
  type Unsub = CompositeSubscription;

  fn actual_subscribe<O>(self, observer: O) -> CompositeSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let slots = SourceSlots::new(self.sources.len());
    let gate = MutArc::own(AmbState { observer: Some(observer), winner: None });

    for (index, source) in self.sources.into_iter().enumerate() {
      if slots.is_group_closed() || gate.rc_deref().winner.is_some() {
        break;
      }
      let contender = AmbObserver { index, gate: gate.clone(), slots: slots.clone() };
      slots.assign(index, source.actual_subscribe(contender));
    }
    slots.group()
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn first_to_notify_wins() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(150, 1),
      on_next(215, 2),
      on_next(230, 20),
      on_completed(240),
    ]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 3),
      on_next(220, 4),
      on_completed(250),
    ]);
    let (a, b) = (o1.clone(), o2.clone());
    let results = scheduler.start(move || a.amb(b));

    assert_eq!(results.messages(), vec![on_next(210, 3), on_next(220, 4), on_completed(250)]);
    assert_eq!(o1.subscriptions(), vec![subscribed(200, 210)]);
    assert_eq!(o2.subscriptions(), vec![subscribed(200, 250)]);
  }

  #[rxcombine_macro::test]
  fn loser_error_can_win() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, &str>(vec![on_error(205, "early")]);
    let o2 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 3)]);
    let o3 = scheduler.create_hot_observable::<i32, &str>(vec![on_next(220, 4)]);
    let (later, last) = (o2.clone(), o3.clone());
    let results = scheduler.start(move || factory::amb([o1, o2, o3]));

    assert_eq!(results.messages(), vec![on_error(205, "early")]);
    assert_eq!(later.subscriptions(), vec![subscribed(200, 205)]);
    assert_eq!(last.subscriptions(), vec![subscribed(200, 205)]);
  }

  #[rxcombine_macro::test]
  fn never_sources_stay_live() {
    let scheduler = TestScheduler::new();
    let o1 = scheduler.create_hot_observable::<i32, ()>(vec![on_next(150, 1)]);
    let o2 = scheduler.create_hot_observable::<i32, ()>(vec![on_next(150, 2)]);
    let (a, b) = (o1.clone(), o2.clone());
    let results = scheduler.start(move || a.amb(b));

    assert!(results.messages().is_empty());
    assert_eq!(o1.subscriptions(), vec![subscribed(200, 1000)]);
    assert_eq!(o2.subscriptions(), vec![subscribed(200, 1000)]);
  }

  #[rxcombine_macro::test]
  fn synchronous_winner_skips_later_sources() {
    let scheduler = TestScheduler::new();
    let late = scheduler.create_hot_observable::<i32, ()>(vec![on_next(300, 9)]);
    let recorded = late.clone();
    let results = scheduler.start(move || factory::amb([of(1).box_it(), late.box_it()]));

    assert_eq!(results.messages(), vec![on_next(200, 1), on_completed(200)]);
    assert!(recorded.subscriptions().is_empty());
  }
}
