//! Buffer operator implementation
//!
//! Collects source values into `Vec`s. A buffer is emitted when it closes,
//! and completion of the source emits whatever is still open, possibly empty,
//! before completing. An error drops every open buffer.

use super::groups::{Boundary, Group, GroupKind, Grouped, Toggle, When};

/// Selects `Vec<Item>` groups emitted at close.
pub struct BufferKind;

impl<Item, Err> GroupKind<Item, Err> for BufferKind {
  type Group = Vec<Item>;
}

impl<Item, Err> Group<Err> for Vec<Item> {
  type Item = Item;
  type Output = Vec<Item>;

  fn open() -> (Self, Option<Vec<Item>>) { (Vec::new(), None) }

  fn push(&mut self, value: Item) { Vec::push(self, value); }

  fn close(self) -> Option<Vec<Item>> { Some(self) }

  fn fail(self, _err: &Err) {}
}

/// Buffers rotated each time a boundary observable emits.
pub type Buffer<S, B> = Grouped<S, Boundary<B>, BufferKind>;

/// Buffers closed by a fresh closing observable per buffer.
pub type BufferWhen<S, F> = Grouped<S, When<F>, BufferKind>;

/// Possibly overlapping buffers opened by an openings observable.
pub type BufferToggle<S, Op, F> = Grouped<S, Toggle<Op, F>, BufferKind>;

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  fn boundary_script(scheduler: &TestScheduler) -> HotObservable<i32, &'static str> {
    scheduler.create_hot_observable(vec![
      on_next(90, 1),
      on_next(180, 2),
      on_next(250, 3),
      on_next(260, 4),
      on_next(310, 5),
      on_next(340, 6),
      on_next(410, 7),
      on_next(420, 8),
      on_next(470, 9),
      on_next(550, 10),
      on_completed(590),
    ])
  }

  #[rxcombine_macro::test]
  fn boundary_rotates_buffers() {
    let scheduler = TestScheduler::new();
    let xs = boundary_script(&scheduler);
    let ys = scheduler.create_hot_observable::<bool, &str>(vec![
      on_next(255, true),
      on_next(330, true),
      on_next(350, true),
      on_next(400, true),
      on_next(500, true),
      on_completed(900),
    ]);
    let (source, boundary) = (xs.clone(), ys.clone());
    let results = scheduler.start(move || source.buffer(boundary));

    assert_eq!(
      results.messages(),
      vec![
        on_next(255, vec![3]),
        on_next(330, vec![4, 5]),
        on_next(350, vec![6]),
        on_next(400, vec![]),
        on_next(500, vec![7, 8, 9]),
        on_next(590, vec![10]),
        on_completed(590),
      ]
    );
    assert_eq!(xs.subscriptions(), vec![subscribed(200, 590)]);
    assert_eq!(ys.subscriptions(), vec![subscribed(200, 590)]);
  }

  #[rxcombine_macro::test]
  fn boundary_completion_flushes_and_completes() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 1), on_next(220, 2)]);
    let ys = scheduler.create_hot_observable::<(), &str>(vec![on_completed(230)]);
    let recorded = xs.clone();
    let results = scheduler.start(move || xs.buffer(ys));

    assert_eq!(results.messages(), vec![on_next(230, vec![1, 2]), on_completed(230)]);
    assert_eq!(recorded.subscriptions(), vec![subscribed(200, 230)]);
  }

  #[rxcombine_macro::test]
  fn source_error_drops_the_open_buffer() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 1), on_error(220, "boom")]);
    let ys = scheduler.create_hot_observable::<(), &str>(vec![on_next(300, ())]);
    let results = scheduler.start(move || xs.buffer(ys));

    assert_eq!(results.messages(), vec![on_error(220, "boom")]);
  }

  #[rxcombine_macro::test]
  fn boundary_error_is_terminal() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 1)]);
    let ys = scheduler.create_hot_observable::<(), &str>(vec![on_error(220, "boundary")]);
    let results = scheduler.start(move || xs.buffer(ys));

    assert_eq!(results.messages(), vec![on_error(220, "boundary")]);
  }

  #[rxcombine_macro::test]
  fn closing_selector_makes_one_closing_per_buffer() {
    let scheduler = TestScheduler::new();
    let xs = boundary_script(&scheduler);
    let calls = Arc::new(Mutex::new(0));
    let (sched, c) = (scheduler.clone(), calls.clone());
    let results = scheduler.start(move || {
      xs.buffer_when(move || {
        *c.lock().unwrap() += 1;
        Ok(timer(Duration::from_millis(100), sched.clone()))
      })
    });

    assert_eq!(
      results.messages(),
      vec![
        on_next(300, vec![3, 4]),
        on_next(400, vec![5, 6]),
        on_next(500, vec![7, 8, 9]),
        on_next(590, vec![10]),
        on_completed(590),
      ]
    );
    assert_eq!(*calls.lock().unwrap(), 4);
  }

  #[rxcombine_macro::test]
  fn closing_selector_failure_at_subscribe() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![on_next(210, 1), on_completed(300)]);
    let recorded = xs.clone();
    let results = scheduler
      .start(move || xs.buffer_when(|| Err::<Never<(), &'static str>, _>("no closing")));

    assert_eq!(results.messages(), vec![on_error(200, "no closing")]);
    assert_eq!(recorded.subscriptions(), vec![subscribed(200, 200)]);
  }

  #[rxcombine_macro::test]
  fn toggled_buffers_overlap() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(220, 1),
      on_next(240, 2),
      on_next(260, 3),
      on_next(280, 4),
      on_completed(400),
    ]);
    let openings =
      scheduler.create_hot_observable::<u64, &str>(vec![on_next(215, 50), on_next(250, 20)]);
    let sched = scheduler.clone();
    let results = scheduler.start(move || {
      xs.buffer_toggle(openings, move |ms| Ok(timer(Duration::from_millis(ms), sched.clone())))
    });

    assert_eq!(
      results.messages(),
      vec![on_next(265, vec![1, 2, 3]), on_next(270, vec![3]), on_completed(400)]
    );
  }

  #[rxcombine_macro::test]
  fn toggle_selector_failure_is_terminal() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(205, 1),
      on_next(220, 2),
      on_completed(400),
    ]);
    let openings = scheduler.create_hot_observable::<u64, &str>(vec![on_next(210, 50)]);
    let (source, opens) = (xs.clone(), openings.clone());
    let results = scheduler.start(move || {
      source.buffer_toggle(opens, |_| Err::<Never<(), &'static str>, _>("no closing"))
    });

    assert_eq!(results.messages(), vec![on_error(210, "no closing")]);
    assert_eq!(xs.subscriptions(), vec![subscribed(200, 210)]);
    assert_eq!(openings.subscriptions(), vec![subscribed(200, 210)]);
  }

  #[rxcombine_macro::test]
  fn toggle_flushes_open_buffers_on_completion() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(220, 1),
      on_next(240, 2),
      on_completed(250),
    ]);
    let openings =
      scheduler.create_hot_observable::<u64, &str>(vec![on_next(210, 100), on_next(230, 100)]);
    let sched = scheduler.clone();
    let results = scheduler.start(move || {
      xs.buffer_toggle(openings, move |ms| Ok(timer(Duration::from_millis(ms), sched.clone())))
    });

    assert_eq!(
      results.messages(),
      vec![on_next(250, vec![1, 2]), on_next(250, vec![2]), on_completed(250)]
    );
  }

  #[rxcombine_macro::test]
  fn buffer_with_time() {
    let scheduler = TestScheduler::new();
    let xs = scheduler.create_hot_observable::<i32, &str>(vec![
      on_next(210, 1),
      on_next(230, 2),
      on_next(260, 3),
      on_completed(270),
    ]);
    let sched = scheduler.clone();
    let results =
      scheduler.start(move || xs.buffer_with_time(Duration::from_millis(50), sched.clone()));

    assert_eq!(
      results.messages(),
      vec![on_next(250, vec![1, 2]), on_next(270, vec![3]), on_completed(270)]
    );
  }

  #[rxcombine_macro::test]
  fn synchronous_source_flushes_on_completion() {
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    from_iter::<_, ()>(vec![1, 2, 3])
      .buffer(never::<(), ()>())
      .subscribe_all(move |b| s.lock().unwrap().push(b), |_| {}, || {});
    assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2, 3]]);
  }
}
