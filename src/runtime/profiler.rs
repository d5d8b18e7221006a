use crate::policy::PolicyKind;
use std::time::{Duration, Instant, SystemTime};

/// A run profiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiler {
    /// The time point where the simulation started.
    pub simulation_start: SystemTime,

    time_start: Instant,
    /// The wall-clock duration of the simulation.
    pub duration: Duration,

    /// The number of events that where executed.
    pub event_count: usize,
    /// The number of events deferred by a blocked CPU.
    pub rescheduled: usize,
    /// The number of events dropped without execution.
    pub dropped: usize,
    /// The number of executed windows.
    pub rounds: usize,

    /// The number of worker threads.
    pub workers: usize,
    /// The scheduler policy in use.
    pub policy: PolicyKind,
}

impl Profiler {
    pub(crate) fn new(policy: PolicyKind, workers: usize) -> Self {
        Self {
            simulation_start: SystemTime::now(),
            time_start: Instant::now(),
            duration: Duration::ZERO,
            event_count: 0,
            rescheduled: 0,
            dropped: 0,
            rounds: 0,
            workers,
            policy,
        }
    }

    /// Starts the profile.
    pub(crate) fn start(&mut self) {
        self.simulation_start = SystemTime::now();
        self.time_start = Instant::now();
    }

    /// Finishes the profile.
    pub(crate) fn finish(&mut self, counters: Counters) {
        self.event_count = counters.executed;
        self.rescheduled = counters.rescheduled;
        self.dropped = counters.dropped;
        self.rounds = counters.rounds;
        self.duration = self.time_start.elapsed();
    }
}

/// The counters collected during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub(crate) executed: usize,
    pub(crate) rescheduled: usize,
    pub(crate) dropped: usize,
    pub(crate) rounds: usize,
}
