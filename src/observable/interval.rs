use std::marker::PhantomData;

use crate::{
  observable::CoreObservable,
  observer::Observer,
  scheduler::{Duration, Scheduler, TaskHandle},
};

/// Emits `0, 1, 2, ...` every `period` of `scheduler` time, forever.
///
/// `buffer_with_time` and `window_with_time` use it as their boundary.
pub fn interval<Sch, Err>(period: Duration, scheduler: Sch) -> Interval<Sch, Err>
where
  Sch: Scheduler,
{
  Interval { period, scheduler, _marker: PhantomData }
}

#[derive(Clone)]
pub struct Interval<Sch, Err> {
  period: Duration,
  scheduler: Sch,
  _marker: PhantomData<fn() -> Err>,
}

impl<Sch, Err> CoreObservable for Interval<Sch, Err>
where
  Sch: Scheduler,
{
  type Item = usize;
  type Err = Err;
  type Unsub = TaskHandle;

  fn actual_subscribe<O>(self, mut observer: O) -> TaskHandle
  where
    O: Observer<usize, Err> + Send + 'static,
  {
    let mut tick = 0;
    self.scheduler.schedule_periodic(self.period, move || {
      observer.next(tick);
      tick += 1;
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcombine_macro::test]
  fn ticks_until_unsubscribed() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let s = seen.clone();
    let c = scheduler.clone();
    let subscription = interval::<_, ()>(Duration::from_millis(10), scheduler.clone())
      .subscribe_all(move |v| s.lock().unwrap().push((c.clock(), v)), |_| {}, || {});

    scheduler.advance_to(Duration::from_millis(35));
    subscription.unsubscribe();
    scheduler.advance_to(Duration::from_millis(100));
    assert_eq!(*seen.lock().unwrap(), vec![(10, 0), (20, 1), (30, 2)]);
  }
}
