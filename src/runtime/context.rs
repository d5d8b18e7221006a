use super::{schedule_time, Violation};
use crate::{
    event::{Event, Task},
    host::{Host, HostId, Topology},
    policy::SchedulerPolicy,
    sync::RoundBarrier,
    time::{Duration, SimTime},
};
use rand::{distr::StandardUniform, prelude::Distribution, rngs::StdRng, Rng};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Mutex,
};
use tracing::{info, trace};

/// The half-open interval `[start, end)` of simulated time one round covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) start: SimTime,
    pub(crate) end: SimTime,
}

///
/// The state shared between the coordinator and all workers of a run.
///
/// The window is only written by the coordinator while all workers wait
/// at the round barrier.
///
pub(crate) struct EngineContext<'a> {
    pub(crate) policy: &'a SchedulerPolicy,
    pub(crate) hosts: &'a [Mutex<Host>],
    pub(crate) topology: Option<&'a dyn Topology>,
    pub(crate) barrier: RoundBarrier,

    window_start: AtomicU64,
    window_end: AtomicU64,
    latest: AtomicU64,

    killed: AtomicBool,
    shutdown: AtomicBool,

    pub(crate) executed: AtomicUsize,
    pub(crate) rescheduled: AtomicUsize,
}

impl<'a> EngineContext<'a> {
    pub(crate) fn new(
        policy: &'a SchedulerPolicy,
        hosts: &'a [Mutex<Host>],
        topology: Option<&'a dyn Topology>,
        now: SimTime,
    ) -> Self {
        Self {
            policy,
            hosts,
            topology,
            barrier: RoundBarrier::new(policy.num_workers()),
            window_start: AtomicU64::new(now.as_nanos()),
            window_end: AtomicU64::new(now.as_nanos()),
            latest: AtomicU64::new(now.as_nanos()),
            killed: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            executed: AtomicUsize::new(0),
            rescheduled: AtomicUsize::new(0),
        }
    }

    pub(crate) fn publish(&self, window: Window) {
        self.window_start
            .store(window.start.as_nanos(), Ordering::Release);
        self.window_end.store(window.end.as_nanos(), Ordering::Release);
    }

    pub(crate) fn window(&self) -> Window {
        Window {
            start: SimTime::from_nanos(self.window_start.load(Ordering::Acquire)),
            end: SimTime::from_nanos(self.window_end.load(Ordering::Acquire)),
        }
    }

    /// The time of the latest executed event.
    pub(crate) fn latest(&self) -> SimTime {
        SimTime::from_nanos(self.latest.load(Ordering::Acquire))
    }

    pub(crate) fn observe(&self, time: SimTime) {
        self.latest.fetch_max(time.as_nanos(), Ordering::AcqRel);
    }

    pub(crate) fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

///
/// The view of the engine a task gets while it executes on a host.
///
/// # Examples
///
/// ```
/// # use pdes::prelude::*;
/// let ping = Task::named("ping", |ctx| {
///     let peer = HostId::new(1);
///     let pong = Task::named("pong", |ctx| {
///         assert_eq!(ctx.host_name(), "b");
///     });
///     ctx.schedule(pong, peer, Duration::from_millis(5));
/// });
///
/// let mut engine = Builder::seeded(1).quiet().build().unwrap();
/// let a = engine.add_host(HostConfig::new("a"));
/// let _ = engine.add_host(HostConfig::new("b"));
/// engine.schedule(ping, a, Duration::ZERO).unwrap();
/// let result = engine.run().unwrap();
/// assert!(matches!(result, RuntimeResult::Finished { .. }));
/// assert_eq!(result.time(), SimTime::from_millis(5));
/// ```
pub struct HostContext<'a> {
    engine: &'a EngineContext<'a>,
    host: &'a mut Host,
    now: SimTime,
}

impl<'a> HostContext<'a> {
    pub(crate) fn new(engine: &'a EngineContext<'a>, host: &'a mut Host, now: SimTime) -> Self {
        Self { engine, host, now }
    }

    /// The simulated time of the executing event.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The id of the executing host.
    #[must_use]
    pub fn host_id(&self) -> HostId {
        self.host.id()
    }

    /// The name of the executing host.
    #[must_use]
    pub fn host_name(&self) -> &str {
        self.host.name()
    }

    ///
    /// Schedules `task` on `host`, `delay` after the current time.
    ///
    /// Events for other hosts that would fall into the current window are
    /// deferred to the window end, thus cross-host delays should not be
    /// shorter than the latency between the hosts.
    ///
    /// # Panics
    ///
    /// Panics if `host` was never registered, or if the event would not
    /// lie before [`SimTime::MAX`].
    ///
    pub fn schedule(&mut self, task: Task, host: HostId, delay: Duration) {
        if host.index() >= self.engine.hosts.len() {
            panic!("{}", Violation::UnknownHost(host));
        }
        let Some(mut time) = schedule_time(self.now, delay) else {
            panic!("{}", Violation::TimeOverflow { now: self.now, delay });
        };

        if host != self.host.id() {
            let end = self.engine.window().end;
            if time < end {
                trace!(
                    task = task.name(),
                    %host,
                    from = %time,
                    to = %end,
                    "deferring to window end"
                );
                time = end;
            }
        }

        let sequence = self.host.next_sequence();
        self.engine
            .policy
            .push(Event::from_host(task, host, time, self.host.id(), sequence));
    }

    /// Schedules `task` on the executing host, `delay` after the current time.
    pub fn schedule_local(&mut self, task: Task, delay: Duration) {
        let host = self.host.id();
        self.schedule(task, host, delay);
    }

    /// The minimum latency towards `host`, if a topology is known.
    #[must_use]
    pub fn latency_to(&self, host: HostId) -> Option<Duration> {
        self.engine
            .topology
            .map(|topology| topology.min_latency_between(self.host.id(), host))
    }

    ///
    /// Consumes processing time on the host's virtual processor. Once the
    /// processor is blocked, further events of this host are deferred
    /// until it becomes available again.
    ///
    pub fn consume_cpu(&mut self, duration: Duration) {
        self.host.cpu.add_delay(duration);
    }

    ///
    /// Stops the simulation. The current window still completes on every
    /// worker. Afterwards all queued events are dropped without execution.
    ///
    pub fn stop(&mut self) {
        info!(host = %self.host.id(), "stop requested");
        self.engine.kill();
    }

    /// Generates a random value using the host's random number generator.
    pub fn random<T>(&mut self) -> T
    where
        StandardUniform: Distribution<T>,
    {
        self.host.rng.random()
    }

    /// The random number generator of the executing host.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.host.rng
    }
}

impl std::fmt::Debug for HostContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("host", &self.host.id())
            .field("now", &self.now)
            .finish()
    }
}
