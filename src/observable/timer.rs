use std::marker::PhantomData;

use crate::{
  observable::CoreObservable,
  observer::Observer,
  scheduler::{Duration, Scheduler, TaskHandle},
};

/// Emits `0` after `delay` of `scheduler` time, then completes.
///
/// Typical closing selector for `buffer_when`/`window_when`.
pub fn timer<Sch, Err>(delay: Duration, scheduler: Sch) -> Timer<Sch, Err>
where
  Sch: Scheduler,
{
  Timer { delay, scheduler, _marker: PhantomData }
}

#[derive(Clone)]
pub struct Timer<Sch, Err> {
  delay: Duration,
  scheduler: Sch,
  _marker: PhantomData<fn() -> Err>,
}

impl<Sch, Err> CoreObservable for Timer<Sch, Err>
where
  Sch: Scheduler,
{
  type Item = usize;
  type Err = Err;
  type Unsub = TaskHandle;

  fn actual_subscribe<O>(self, observer: O) -> TaskHandle
  where
    O: Observer<usize, Err> + Send + 'static,
  {
    self.scheduler.schedule_after(self.delay, move || {
      let mut observer = observer;
      if !observer.is_closed() {
        observer.next(0);
        observer.complete();
      }
    })
  }
}
