//! # rxcombine: multi-source combinators for Reactive Extensions in Rust
//!
//! The operators that subscribe to more than one upstream: racing, merging,
//! zipping, gating, re-sequencing and windowing streams, each one a small
//! thread-safe state machine that delivers a serialized, terminal-exclusive
//! notification sequence.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcombine::prelude::*;
//!
//! from_iter::<_, ()>(vec![1, 2, 3])
//!   .zip(from_iter(vec![10, 20, 30]))
//!   .map(|(a, b)| a + b)
//!   .subscribe_all(|v| println!("Value: {v}"), |_| {}, || println!("done"));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CoreObservable`] | The subscription contract every source and operator implements |
//! | [`Observable`] | Subscribe helpers and every combinator as a method |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`Scheduler`] | Where delays and periods run: thread pool, tokio or virtual time |
//!
//! ## Operators
//!
//! `amb`, `buffer*`, `catch*`, `combine_latest`, `concat*`, `merge*`,
//! `on_error_resume_next`, `skip_until`, `take_until`, `switch_on_next`,
//! `window*` and `zip*`. N-ary forms live in [`factory`].
//!
//! ## Testing in virtual time
//!
//! The [`testing`] module scripts hot and cold observables on a
//! [`TestScheduler`] and records what a pipeline emits and when each source
//! was subscribed.
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): [`ThreadPoolScheduler`] on the futures
//!   thread pool
//! - **`tokio-scheduler`**: `TokioScheduler` over a tokio runtime handle
//!
//! [`CoreObservable`]: observable::CoreObservable
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`TestScheduler`]: scheduler::TestScheduler
//! [`ThreadPoolScheduler`]: scheduler::ThreadPoolScheduler

pub mod error;
pub mod factory;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
mod subject;
pub mod subscription;
pub mod testing;

// Re-export the prelude module
pub use prelude::*;
