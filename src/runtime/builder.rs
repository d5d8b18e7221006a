use super::{Config, Engine, EngineState, RuntimeError, RuntimeLimit};
use crate::{
    host::Topology,
    policy::{PolicyKind, SchedulerPolicy},
    time::{Duration, SimTime},
};
use std::{fmt::Debug, sync::Arc};

/// A builder for an engine instance.
#[must_use]
pub struct Builder {
    pub(super) quiet: bool,
    pub(super) seed: u64,
    pub(super) limit: RuntimeLimit,
    pub(super) start_time: SimTime,

    pub(super) workers: usize,
    pub(super) policy: PolicyKind,
    pub(super) min_time_jump: Option<Duration>,
    pub(super) topology: Option<Arc<dyn Topology>>,
}

impl Builder {
    /// Creates a new unconfigured builder, seeded from the thread-local
    /// random number generator.
    pub fn new() -> Builder {
        Builder::seeded(rand::random())
    }

    /// Creates a `Builder` with a static seed.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            quiet: false,
            seed,
            limit: RuntimeLimit::None,
            start_time: SimTime::MIN,

            workers: 1,
            policy: PolicyKind::default(),
            min_time_jump: None,
            topology: None,
        }
    }

    ///
    /// Creates a `Builder` from a configuration.
    ///
    /// ```
    /// # use pdes::prelude::*;
    /// let config = Config {
    ///     num_worker_threads: 4,
    ///     scheduler_policy: PolicyKind::PerThreadPerHost,
    ///     ..Config::default()
    /// };
    /// let engine = Builder::from_config(&config).quiet().build().unwrap();
    /// assert_eq!(engine.policy().kind(), PolicyKind::PerThreadPerHost);
    /// assert_eq!(engine.policy().num_workers(), 4);
    /// ```
    pub fn from_config(config: &Config) -> Builder {
        let mut builder = Builder::seeded(config.seed)
            .workers(config.num_worker_threads)
            .policy(config.scheduler_policy);

        if let Some(jump) = config.min_time_jump_ns {
            builder = builder.min_time_jump(Duration::from_nanos(jump));
        }
        if let Some(stop) = config.stop_time_ns {
            builder = builder.max_time(SimTime::from_nanos(stop));
        }
        builder
    }

    ///
    /// Suppressed runtime messages from the simulation framework.
    ///
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    ///
    /// Changes the start time of the simulation.
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Changes the maximum iteration number of a runtime.
    ///
    /// The limit is checked between windows, and a started window always
    /// completes. The run stops at the first window boundary with at least
    /// `max_itr` events executed, thus the final count may exceed `max_itr`
    /// by the events of the last window.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    ///
    /// Changes the maximum time of the runtime (default: inf).
    ///
    pub fn max_time(mut self, max_time: SimTime) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time));
        self
    }

    ///
    /// Adds a custom limit, combined with all previous limits by a
    /// logical OR.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Sets the number of worker threads. Zero and one both execute
    /// every round on the thread calling [`Engine::run`].
    ///
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the scheduler policy.
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    ///
    /// Bounds the length of each window. If a topology is set as well, the
    /// smaller of both bounds is used.
    ///
    pub fn min_time_jump(mut self, jump: Duration) -> Self {
        self.min_time_jump = Some(jump);
        self
    }

    /// Sets the topology, used to derive the window length.
    pub fn topology(mut self, topology: impl Topology + 'static) -> Self {
        self.topology = Some(Arc::new(topology));
        self
    }

    ///
    /// Builds a new [`Engine`] instance.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::MissingWorkers`] if the policy requires
    /// worker threads but none were configured, and
    /// [`RuntimeError::ZeroTimeJump`] for an explicit window length of zero.
    ///
    pub fn build(self) -> Result<Engine, RuntimeError> {
        if self.min_time_jump.is_some_and(|jump| jump.is_zero()) {
            return Err(RuntimeError::ZeroTimeJump);
        }

        Ok(Engine {
            hosts: Vec::new(),
            policy: SchedulerPolicy::new(self.policy, self.workers)?,
            topology: self.topology,
            min_time_jump: self.min_time_jump,
            limit: self.limit,

            seed: self.seed,
            quiet: self.quiet,

            now: self.start_time,
            state: EngineState::Idle,
            next_sequence: 0,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("seed", &self.seed)
            .field("limit", &self.limit)
            .field("workers", &self.workers)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
