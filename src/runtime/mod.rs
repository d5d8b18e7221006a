//!
//! The central management point for simulations.
//!
//! An [`Engine`] owns all hosts and the [`SchedulerPolicy`] holding the
//! pending events. Running the engine advances simulated time in windows
//! of at most [`Engine::min_time_jump`]: within a window, workers execute
//! the events of their hosts concurrently, and a barrier separates one
//! window from the next.
//!

use crate::{
    event::{Event, Task},
    host::{min_latency, Host, HostConfig, HostId, Topology},
    logger,
    policy::SchedulerPolicy,
    sync,
    time::{Duration, SimTime},
};
use std::{
    fmt::{Debug, Display},
    sync::{atomic::Ordering, Arc, Mutex, MutexGuard},
};
use tracing::{debug, info, warn};

mod builder;
pub use self::builder::*;

mod config;
pub use self::config::*;

mod context;
pub use self::context::HostContext;
use self::context::{EngineContext, Window};

mod error;
pub use self::error::*;

mod limit;
pub use self::limit::*;

mod profiler;
pub use self::profiler::*;

mod worker;

/// The window length used if neither a topology nor an explicit
/// bound is available.
pub const DEFAULT_TIME_JUMP: Duration = Duration::from_millis(1);

///
/// The lifecycle state of an [`Engine`].
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Hosts and events may be added.
    Idle,
    /// Workers execute the current window.
    RunningWindow,
    /// All workers reached the barrier, the next window is computed.
    Draining,
    /// The run ended. All remaining events were dropped.
    Stopped,
}

///
/// The result of a simulation run.
///
#[derive(Debug)]
pub enum RuntimeResult {
    /// No event was ever executed or pending.
    EmptySimulation {
        /// The start time of the simulation.
        time: SimTime,
    },
    /// All events were executed.
    Finished {
        /// The time of the last executed event.
        time: SimTime,
        /// The profile of the run.
        profiler: Profiler,
    },
    /// The run ended while events were still pending, either through a
    /// runtime limit or a stop request.
    PrematureAbort {
        /// The time of the last executed event.
        time: SimTime,
        /// The profile of the run.
        profiler: Profiler,
        /// The number of events that were dropped without execution.
        active_events: usize,
    },
}

impl RuntimeResult {
    /// The time at which the simulation ended.
    #[must_use]
    pub fn time(&self) -> SimTime {
        match self {
            Self::EmptySimulation { time }
            | Self::Finished { time, .. }
            | Self::PrematureAbort { time, .. } => *time,
        }
    }

    /// The profile of the run, if any event was executed or pending.
    #[must_use]
    pub fn profiler(&self) -> Option<&Profiler> {
        match self {
            Self::EmptySimulation { .. } => None,
            Self::Finished { profiler, .. } | Self::PrematureAbort { profiler, .. } => {
                Some(profiler)
            }
        }
    }
}

///
/// A parallel discrete event engine.
///
/// # Examples
///
/// ```
/// # use pdes::prelude::*;
/// let mut engine = Builder::seeded(123).workers(2).quiet().build().unwrap();
/// let host = engine.add_host(HostConfig::new("alice"));
///
/// let tick = Task::named("tick", |ctx| {
///     if ctx.now() < SimTime::from_secs(3) {
///         ctx.schedule_local(Task::stop(), Duration::from_secs(10));
///     }
/// });
/// engine.schedule(tick.clone(), host, Duration::from_secs(1)).unwrap();
/// engine.schedule(tick, host, Duration::from_secs(2)).unwrap();
///
/// let result = engine.run().unwrap();
/// assert_eq!(result.time(), SimTime::from_secs(11));
/// assert_eq!(result.profiler().unwrap().event_count, 3);
/// ```
pub struct Engine {
    hosts: Vec<Mutex<Host>>,
    policy: SchedulerPolicy,
    topology: Option<Arc<dyn Topology>>,
    min_time_jump: Option<Duration>,
    limit: RuntimeLimit,

    seed: u64,
    quiet: bool,

    now: SimTime,
    state: EngineState,
    next_sequence: u64,
}

impl Engine {
    /// The current simulation time. Before a run this is the start time,
    /// afterwards the time of the last executed event.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The lifecycle state of the engine.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The number of registered hosts.
    #[must_use]
    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    /// The number of pending events.
    #[must_use]
    pub fn num_events_queued(&self) -> usize {
        self.policy.len()
    }

    /// The scheduler policy of this engine.
    #[must_use]
    pub fn policy(&self) -> &SchedulerPolicy {
        &self.policy
    }

    ///
    /// Registers a new host. Hosts are numbered in registration order.
    ///
    /// # Panics
    ///
    /// Panics if the engine is not idle, or if host ids are exhausted.
    ///
    pub fn add_host(&mut self, config: HostConfig) -> HostId {
        assert_eq!(
            self.state,
            EngineState::Idle,
            "hosts can only be added to idle engines"
        );

        let id = HostId::new(u32::try_from(self.hosts.len()).expect("too many hosts"));
        debug!(%id, name = %config.name, "adding host");
        self.hosts.push(Mutex::new(Host::new(id, config, self.seed)));
        self.policy.add_host(id);
        id
    }

    /// The state of a host, for inspection.
    pub fn host(&self, id: HostId) -> Option<MutexGuard<'_, Host>> {
        self.hosts.get(id.index()).map(sync::lock)
    }

    ///
    /// Schedules `task` on `host`, `delay` after the current time.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownHost`] if `host` was never registered,
    /// and [`RuntimeError::TimeOverflow`] if the event would not lie before
    /// [`SimTime::MAX`].
    ///
    /// # Panics
    ///
    /// Panics if the engine is not idle.
    ///
    pub fn schedule(
        &mut self,
        task: Task,
        host: HostId,
        delay: Duration,
    ) -> Result<(), RuntimeError> {
        assert_eq!(
            self.state,
            EngineState::Idle,
            "events can only be scheduled from outside on idle engines"
        );
        if host.index() >= self.hosts.len() {
            return Err(RuntimeError::UnknownHost(host));
        }
        let time = schedule_time(self.now, delay).ok_or(RuntimeError::TimeOverflow {
            now: self.now,
            delay,
        })?;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.policy.push(Event::new(task, host, time, sequence));
        Ok(())
    }

    ///
    /// The maximum length of a window.
    ///
    /// Derived from the topology as the minimum latency between any two
    /// registered hosts. A configured bound lowers that value further.
    /// Without either, [`DEFAULT_TIME_JUMP`] is used.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ZeroTimeJump`] if the resulting bound is zero.
    ///
    pub fn min_time_jump(&self) -> Result<Duration, RuntimeError> {
        let derived = self
            .topology
            .as_deref()
            .and_then(|topology| min_latency(topology, self.hosts.len()));

        let jump = match (derived, self.min_time_jump) {
            (Some(derived), Some(configured)) => derived.min(configured),
            (Some(jump), None) | (None, Some(jump)) => jump,
            (None, None) => DEFAULT_TIME_JUMP,
        };

        if jump.is_zero() {
            Err(RuntimeError::ZeroTimeJump)
        } else {
            Ok(jump)
        }
    }

    ///
    /// Runs the simulation until no events are left, a runtime limit
    /// applies, or a task requested a stop.
    ///
    /// All events still pending afterwards are dropped without execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the window length is misconfigured.
    ///
    /// # Panics
    ///
    /// Panics if the engine already ran, or if a scheduling invariant is
    /// violated. A violation inside a worker thread aborts the process.
    ///
    pub fn run(&mut self) -> Result<RuntimeResult, RuntimeError> {
        assert_eq!(
            self.state,
            EngineState::Idle,
            "Engine::run can only be used for engines in the idle state"
        );
        let jump = self.min_time_jump()?;
        let workers = self.policy.num_workers();

        self.start(jump);

        let mut profiler = Profiler::new(self.policy.kind(), workers);
        profiler.start();

        let ctx = EngineContext::new(
            &self.policy,
            &self.hosts,
            self.topology.as_deref(),
            self.now,
        );
        let state = &mut self.state;
        let limit = &self.limit;
        let start = self.now;

        let rounds = if workers <= 1 {
            coordinate(&ctx, limit, jump, start, state, || worker::run_round(&ctx, 0))
        } else {
            std::thread::scope(|s| {
                for id in 0..workers {
                    let ctx = &ctx;
                    s.spawn(move || worker::work(ctx, id));
                }

                let rounds = coordinate(&ctx, limit, jump, start, state, || {
                    ctx.barrier.release();
                    ctx.barrier.join();
                });

                ctx.shutdown();
                ctx.barrier.release();
                rounds
            })
        };

        let counters = Counters {
            executed: ctx.executed.load(Ordering::SeqCst),
            rescheduled: ctx.rescheduled.load(Ordering::SeqCst),
            dropped: self.policy.drain().len(),
            rounds,
        };
        let killed = ctx.is_killed();
        let latest = ctx.latest();
        drop(ctx);

        profiler.finish(counters);
        self.now = latest;
        self.state = EngineState::Stopped;

        Ok(self.finish(profiler, killed))
    }

    fn start(&self, jump: Duration) {
        info!(
            policy = %self.policy.kind(),
            workers = self.policy.num_workers(),
            hosts = self.hosts.len(),
            ?jump,
            limit = %self.limit,
            "simulation starting"
        );

        if !self.quiet {
            println!("\u{23A1}");
            println!("\u{23A2} Simulation starting");
            println!(
                "\u{23A2}  Policy := {} ({} workers, {} hosts)",
                self.policy.kind(),
                self.policy.num_workers(),
                self.hosts.len()
            );
            println!("\u{23A2}  Time jump := {jump:?}");
            println!("\u{23A2}  Event limit := {}", self.limit);
            println!("\u{23A3}");
        }
    }

    fn finish(&self, profiler: Profiler, killed: bool) -> RuntimeResult {
        let time = self.now;

        if profiler.event_count == 0 && profiler.rescheduled == 0 && profiler.dropped == 0 {
            info!("empty simulation");
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Empty simulation");
                println!("\u{23A2}  Ended at event #0 after 0s");
                println!("\u{23A3}");
            }

            return RuntimeResult::EmptySimulation { time };
        }

        if profiler.dropped == 0 {
            info!(events = profiler.event_count, %time, "simulation ended");
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Simulation ended");
                println!(
                    "\u{23A2}  Ended at event #{} after {} in {} rounds",
                    profiler.event_count, time, profiler.rounds
                );
                println!("\u{23A3}");
            }

            RuntimeResult::Finished { time, profiler }
        } else {
            let active_events = profiler.dropped;
            warn!(
                events = profiler.event_count,
                active_events,
                killed,
                %time,
                "simulation ended prematurely"
            );
            if !self.quiet {
                println!("\u{23A1}");
                println!("\u{23A2} Simulation ended prematurly");
                println!(
                    "\u{23A2}  Ended at event #{} with {} active events after {}",
                    profiler.event_count, active_events, time
                );
                println!("\u{23A3}");
            }

            RuntimeResult::PrematureAbort {
                time,
                profiler,
                active_events,
            }
        }
    }
}

///
/// The time `delay` after `now`, if it lies before [`SimTime::MAX`]. That
/// value marks empty queues, so no event may be scheduled at it.
///
pub(crate) fn schedule_time(now: SimTime, delay: Duration) -> Option<SimTime> {
    now.checked_add(delay).filter(|time| !time.is_infinite())
}

///
/// The coordinator loop. Computes windows and hands them to `round`,
/// which returns once every worker drained the window.
///
/// Returns the number of executed rounds.
///
fn coordinate(
    ctx: &EngineContext<'_>,
    limit: &RuntimeLimit,
    jump: Duration,
    start: SimTime,
    state: &mut EngineState,
    mut round: impl FnMut(),
) -> usize {
    let cap = limit
        .time_bound()
        .map_or(SimTime::MAX, |bound| bound.saturating_add(Duration::from_nanos(1)));

    let mut prev_end = start;
    let mut rounds = 0;
    loop {
        let next = ctx.policy.next_time();
        if next == SimTime::MAX || ctx.is_killed() {
            break;
        }
        if limit.applies(ctx.executed.load(Ordering::SeqCst) + 1, next) {
            debug!(%next, "runtime limit reached");
            break;
        }

        let start = prev_end.max(next);
        let window = Window {
            start,
            end: start.saturating_add(jump).min(cap),
        };

        ctx.policy.prepare_round();
        ctx.publish(window);
        logger::set_time(window.start);
        debug!(round = rounds, start = %window.start, end = %window.end, "window released");

        *state = EngineState::RunningWindow;
        round();
        *state = EngineState::Draining;

        prev_end = window.end;
        rounds += 1;
    }
    rounds
}

impl Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("now", &self.now)
            .field("state", &self.state)
            .field("policy", &self.policy.kind())
            .field("hosts", &self.hosts.len())
            .field("queued", &self.policy.len())
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Engine {{ sim_time: {} ({:?}, limit {}) hosts: {} enqueued: {} }}",
            self.now,
            self.state,
            self.limit,
            self.hosts.len(),
            self.policy.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{host::CpuConfig, policy::PolicyKind};

    const HOSTS: u32 = 3;

    // Each execution spawns one successor, either local or on the next host.
    fn chatter() -> Task {
        Task::named("chatter", |ctx| {
            ctx.consume_cpu(Duration::from_micros(300));
            if ctx.now() >= SimTime::from_millis(20) {
                return;
            }
            if ctx.random::<bool>() {
                let next = HostId::new((ctx.host_id().index() as u32 + 1) % HOSTS);
                ctx.schedule(chatter(), next, Duration::from_micros(100));
            } else {
                ctx.schedule_local(chatter(), Duration::from_micros(50));
            }
        })
    }

    #[test]
    fn next_time_never_decreases_between_rounds() {
        for kind in PolicyKind::ALL {
            let mut engine = Builder::seeded(3)
                .policy(kind)
                .min_time_jump(Duration::from_millis(1))
                .quiet()
                .build()
                .unwrap();
            for i in 0..HOSTS {
                let cpu = CpuConfig::throttled(Duration::from_micros(100));
                let _ = engine.add_host(HostConfig::new(format!("h{i}")).cpu(cpu));
                engine
                    .schedule(chatter(), HostId::new(i), Duration::from_micros(u64::from(i)))
                    .unwrap();
            }

            let jump = engine.min_time_jump().unwrap();
            let ctx = EngineContext::new(&engine.policy, &engine.hosts, None, engine.now);
            let mut state = EngineState::Idle;
            let mut times = Vec::new();
            let rounds = coordinate(
                &ctx,
                &RuntimeLimit::None,
                jump,
                engine.now,
                &mut state,
                || {
                    times.push(ctx.policy.next_time());
                    worker::run_round(&ctx, 0);
                },
            );

            assert!(rounds > 10, "{kind}: {rounds} rounds");
            assert_eq!(times.len(), rounds);
            assert!(times.windows(2).all(|w| w[0] <= w[1]), "{kind}: {times:?}");
            assert!(ctx.rescheduled.load(Ordering::SeqCst) > 0, "{kind}");
            assert_eq!(ctx.policy.next_time(), SimTime::MAX);
            assert_eq!(state, EngineState::Draining);
        }
    }

    #[test]
    fn schedule_time_excludes_the_infinite_sentinel() {
        let now = SimTime::from_secs(5);
        assert_eq!(
            schedule_time(now, Duration::from_secs(1)),
            Some(SimTime::from_secs(6))
        );

        let max = Duration::from_nanos(u64::MAX - now.as_nanos());
        assert_eq!(schedule_time(now, max), None);
        assert_eq!(
            schedule_time(now, max - Duration::from_nanos(1)),
            Some(SimTime::from_nanos(u64::MAX - 1))
        );
        assert_eq!(schedule_time(now, Duration::MAX), None);
    }
}
