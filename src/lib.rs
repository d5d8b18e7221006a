#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]
//!
//! A parallel discrete event scheduler.
//!
//! PDES executes the events of simulated hosts on a pool of worker threads.
//! Simulated time advances in windows: within a window every worker drains
//! the events of its hosts concurrently, then all workers meet at a barrier
//! before the next window starts. The window length is bounded by the
//! minimum latency between any two hosts, thus no host can observe an
//! event from another host of the same window.
//!
//! # Building a simple simulation
//!
//! Work is expressed as [`Task`](crate::event::Task)s, which are scheduled
//! on a host at some point of simulated time. While a task executes it can
//! schedule further tasks through its [`HostContext`](crate::runtime::HostContext).
//!
//! ```
//! use pdes::prelude::*;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! fn main() {
//!     let mut engine = Builder::seeded(42)
//!         .workers(4)
//!         .policy(PolicyKind::PerHostSteal)
//!         .topology(UniformLatency(Duration::from_millis(10)))
//!         .quiet()
//!         .build()
//!         .unwrap();
//!
//!     let hosts = (0..8)
//!         .map(|i| engine.add_host(HostConfig::new(format!("host-{i}"))))
//!         .collect::<Vec<_>>();
//!
//!     let received = Arc::new(AtomicUsize::new(0));
//!     let counter = received.clone();
//!     let ping = Task::named("ping", move |_ctx| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     });
//!
//!     for host in &hosts {
//!         engine.schedule(ping.clone(), *host, Duration::from_millis(1)).unwrap();
//!     }
//!
//!     let result = engine.run().unwrap();
//!     assert!(matches!(result, RuntimeResult::Finished { .. }));
//!     assert_eq!(received.load(Ordering::SeqCst), 8);
//! }
//! ```
//!
//! # Scheduler policies
//!
//! How events are distributed onto workers is decided by a
//! [`SchedulerPolicy`](crate::policy::SchedulerPolicy). The policy never
//! changes the order in which the events of a single host are executed,
//! thus a seeded simulation produces the same per-host results for every
//! policy and every number of worker threads.
//!
//! # Logging
//!
//! All components log through `tracing`. [`logger::init`] installs a
//! subscriber that prefixes every line with the simulated time and the
//! executing host.
//!

pub mod prelude;

pub mod event;
pub mod host;
pub mod logger;
pub mod policy;
pub mod runtime;
pub mod time;

pub(crate) mod sync;
