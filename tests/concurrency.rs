//! Upstreams driven from several threads at once.
//!
//! Each combinator must serialize what reaches the subscriber and deliver
//! exactly one terminal notification, whatever thread it arrives on.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc, Mutex,
  },
  thread::{self, JoinHandle},
  time::Duration,
};

use rxcombine::prelude::*;

const COUNT: usize = 1000;

type Joins = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Emits `(tag, 0..count)` from a freshly spawned thread, then completes.
fn threaded(
  tag: usize, count: usize, joins: Joins,
) -> impl CoreObservable<Item = (usize, usize), Err = ()> + Send + 'static {
  create(move |mut emitter: BoxedEmitter<(usize, usize), ()>| {
    let handle = thread::spawn(move || {
      for i in 0..count {
        emitter.next((tag, i));
      }
      emitter.complete();
    });
    joins.lock().unwrap().push(handle);
  })
}

fn join_all(joins: &Joins) {
  let handles: Vec<_> = joins.lock().unwrap().drain(..).collect();
  for handle in handles {
    handle.join().unwrap();
  }
}

#[derive(Default)]
struct Tally<T> {
  values: Mutex<Vec<T>>,
  errors: AtomicUsize,
  completions: AtomicUsize,
}

impl<T: Send + 'static> Tally<T> {
  fn subscribe<S>(self: &Arc<Self>, source: S)
  where
    S: CoreObservable<Item = T, Err = ()> + Send + 'static,
  {
    let (values, errors, completions) = (self.clone(), self.clone(), self.clone());
    source.subscribe_all(
      move |v| values.values.lock().unwrap().push(v),
      move |_| {
        errors.errors.fetch_add(1, Ordering::SeqCst);
      },
      move || {
        completions.completions.fetch_add(1, Ordering::SeqCst);
      },
    );
  }

  fn terminals(&self) -> usize {
    self.errors.load(Ordering::SeqCst) + self.completions.load(Ordering::SeqCst)
  }
}

#[rxcombine_macro::test]
fn merge_delivers_every_value_from_every_thread() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let sources: Vec<_> = (0..4).map(|tag| threaded(tag, COUNT, joins.clone())).collect();
  tally.subscribe(factory::merge(sources));
  join_all(&joins);

  let values = tally.values.lock().unwrap();
  assert_eq!(values.len(), 4 * COUNT);
  for tag in 0..4 {
    let ordered: Vec<_> = values.iter().filter(|(t, _)| *t == tag).map(|(_, i)| *i).collect();
    assert_eq!(ordered, (0..COUNT).collect::<Vec<_>>());
  }
  assert_eq!(tally.completions.load(Ordering::SeqCst), 1);
  assert_eq!(tally.terminals(), 1);
}

#[rxcombine_macro::test]
fn zip_pairs_by_position_across_threads() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let zipped = threaded(0, COUNT, joins.clone()).zip(threaded(1, COUNT, joins.clone()));
  tally.subscribe(zipped);
  join_all(&joins);

  let values = tally.values.lock().unwrap();
  assert_eq!(values.len(), COUNT);
  assert!(values.iter().enumerate().all(|(n, ((_, a), (_, b)))| *a == n && *b == n));
  assert_eq!(tally.completions.load(Ordering::SeqCst), 1);
}

#[rxcombine_macro::test]
fn combine_latest_terminates_once_across_threads() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let combined = threaded(0, COUNT, joins.clone())
    .combine_latest(threaded(1, COUNT, joins.clone()), |latest: &[(usize, usize)]| {
      Ok(latest[0].1 + latest[1].1)
    });
  tally.subscribe(combined);
  join_all(&joins);

  let values = tally.values.lock().unwrap();
  assert!(!values.is_empty());
  assert!(values.len() < 2 * COUNT);
  assert_eq!(values.last(), Some(&(2 * (COUNT - 1))));
  assert_eq!(tally.completions.load(Ordering::SeqCst), 1);
  assert_eq!(tally.terminals(), 1);
}

/// Counts selector calls and reports when the `fail_at`-th one arrives.
fn fails_on(fail_at: usize) -> impl FnMut() -> bool + Send + 'static {
  let mut calls = 0;
  move || {
    calls += 1;
    calls == fail_at
  }
}

#[rxcombine_macro::test]
fn combine_latest_selector_failure_is_the_last_notification() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let mut fail = fails_on(COUNT / 2);
  let combined = threaded(0, COUNT, joins.clone())
    .combine_latest(threaded(1, COUNT, joins.clone()), move |latest: &[(usize, usize)]| {
      if fail() { Err(()) } else { Ok(latest[0].1 + latest[1].1) }
    });
  tally.subscribe(combined);
  join_all(&joins);

  assert_eq!(tally.values.lock().unwrap().len(), COUNT / 2 - 1);
  assert_eq!(tally.errors.load(Ordering::SeqCst), 1);
  assert_eq!(tally.terminals(), 1);
}

#[rxcombine_macro::test]
fn zip_selector_failure_is_the_last_notification() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let sources: Vec<_> = (0..3).map(|tag| threaded(tag, COUNT, joins.clone())).collect();
  let mut fail = fails_on(COUNT / 2);
  let zipped = factory::zip(sources, move |row: Vec<(usize, usize)>| {
    if fail() { Err(()) } else { Ok(row.iter().map(|(_, i)| i).sum::<usize>()) }
  });
  tally.subscribe(zipped);
  join_all(&joins);

  let values = tally.values.lock().unwrap();
  assert_eq!(*values, (0..COUNT / 2 - 1).map(|i| 3 * i).collect::<Vec<_>>());
  assert_eq!(tally.errors.load(Ordering::SeqCst), 1);
  assert_eq!(tally.terminals(), 1);
}

#[rxcombine_macro::test]
fn amb_mirrors_a_single_thread() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let sources: Vec<_> = (0..3).map(|tag| threaded(tag, COUNT, joins.clone())).collect();
  tally.subscribe(factory::amb(sources));
  join_all(&joins);

  let values = tally.values.lock().unwrap();
  let winner = values.first().map(|(tag, _)| *tag);
  assert!(values.iter().all(|(tag, _)| Some(*tag) == winner));
  assert_eq!(values.len(), COUNT);
  assert_eq!(tally.terminals(), 1);
}

#[rxcombine_macro::test]
fn concat_keeps_sources_in_order() {
  let joins = Joins::default();
  let tally = Arc::new(Tally::default());
  let (first, second) = (threaded(0, COUNT, joins.clone()), threaded(1, COUNT, joins.clone()));
  tally.subscribe(first.concat(second));

  // The second thread only exists once the first source completed.
  while tally.terminals() == 0 {
    join_all(&joins);
    thread::yield_now();
  }
  join_all(&joins);

  let values = tally.values.lock().unwrap();
  let expected: Vec<_> = (0..2).flat_map(|tag| (0..COUNT).map(move |i| (tag, i))).collect();
  assert_eq!(*values, expected);
  assert_eq!(tally.completions.load(Ordering::SeqCst), 1);
}

#[cfg(feature = "futures-scheduler")]
#[rxcombine_macro::test]
fn take_until_stops_an_interval_on_the_thread_pool() {
  let pool = ThreadPoolScheduler::new().unwrap();
  let (tx, rx) = mpsc::channel();
  let values = Arc::new(Mutex::new(vec![]));
  let v = values.clone();

  let _subscription = interval::<_, ()>(Duration::from_millis(5), pool.clone())
    .take_until(timer(Duration::from_millis(60), pool))
    .subscribe_all(move |i| v.lock().unwrap().push(i), |_| {}, move || tx.send(()).unwrap());

  rx.recv_timeout(Duration::from_secs(5)).unwrap();
  let values = values.lock().unwrap();
  assert!(!values.is_empty());
  assert_eq!(*values, (0..values.len()).collect::<Vec<_>>());
}

#[cfg(feature = "futures-scheduler")]
#[rxcombine_macro::test]
fn merge_of_timers_on_the_thread_pool() {
  let pool = ThreadPoolScheduler::new().unwrap();
  let (tx, rx) = mpsc::channel();
  let fired = Arc::new(AtomicUsize::new(0));
  let f = fired.clone();

  let timers: Vec<_> =
    (1..=8).map(|ms| timer::<_, ()>(Duration::from_millis(ms * 3), pool.clone())).collect();
  let _subscription = factory::merge(timers).subscribe_all(
    move |_| {
      f.fetch_add(1, Ordering::SeqCst);
    },
    |_| {},
    move || tx.send(()).unwrap(),
  );

  rx.recv_timeout(Duration::from_secs(5)).unwrap();
  assert_eq!(fired.load(Ordering::SeqCst), 8);
}
