//!
//! Scheduler policies, routing events into the queues workers pop from.
//!
//! Every policy partitions the pending events of the simulation into
//! domains that workers drain concurrently within one round. The ordering
//! of events inside a host never depends on the chosen policy; the
//! policy only decides which worker executes which host.
//!

use crate::{event::Event, host::HostId, runtime::RuntimeError, time::SimTime};
use std::{fmt::Display, str::FromStr, sync::MutexGuard};

mod global;
pub use self::global::*;

mod host;
pub use self::host::*;

mod thread;
pub use self::thread::*;

mod thread_host;
pub use self::thread_host::*;

/// The index of a worker thread.
pub type WorkerId = usize;

///
/// The available scheduler policies.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PolicyKind {
    /// One queue shared by all workers.
    #[cfg_attr(feature = "serde", serde(rename = "global"))]
    GlobalSingle,
    /// One queue per host, hosts statically assigned to workers.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "host"))]
    PerHostSingle,
    /// One queue per host, idle workers steal unprocessed hosts.
    #[cfg_attr(feature = "serde", serde(rename = "steal"))]
    PerHostSteal,
    /// One queue per worker.
    #[cfg_attr(feature = "serde", serde(rename = "thread"))]
    PerThreadSingle,
    /// One queue per host, grouped per worker behind a single lock.
    #[cfg_attr(feature = "serde", serde(rename = "threadXhost"))]
    PerThreadPerHost,
}

impl PolicyKind {
    /// All policies, in no particular order.
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::GlobalSingle,
        PolicyKind::PerHostSingle,
        PolicyKind::PerHostSteal,
        PolicyKind::PerThreadSingle,
        PolicyKind::PerThreadPerHost,
    ];

    /// The configuration name of the policy.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GlobalSingle => "global",
            Self::PerHostSingle => "host",
            Self::PerHostSteal => "steal",
            Self::PerThreadSingle => "thread",
            Self::PerThreadPerHost => "threadXhost",
        }
    }

    /// Whether the policy partitions events by worker, and thus needs
    /// at least one explicit worker thread.
    #[must_use]
    pub fn requires_threads(self) -> bool {
        matches!(self, Self::PerThreadSingle | Self::PerThreadPerHost)
    }
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = RuntimeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| RuntimeError::UnknownPolicy(s.to_string()))
    }
}

///
/// A scheduler policy instance, owning all queued events of a simulation.
///
/// Pushes and pops may happen concurrently from all workers. Queue locks
/// are only held for the duration of a single push or pop.
///
#[derive(Debug)]
pub enum SchedulerPolicy {
    /// See [`PolicyKind::GlobalSingle`].
    GlobalSingle(GlobalSingle),
    /// See [`PolicyKind::PerHostSingle`] and [`PolicyKind::PerHostSteal`].
    PerHost(PerHost),
    /// See [`PolicyKind::PerThreadSingle`].
    PerThreadSingle(PerThread),
    /// See [`PolicyKind::PerThreadPerHost`].
    PerThreadPerHost(PerThreadPerHost),
}

impl SchedulerPolicy {
    ///
    /// Creates a new policy of the given kind.
    ///
    /// Policies partitioned by worker fail with
    /// [`RuntimeError::MissingWorkers`] if `num_workers` is zero. All other
    /// policies treat zero workers as one.
    ///
    /// # Errors
    ///
    /// See above.
    ///
    pub fn new(kind: PolicyKind, num_workers: usize) -> Result<Self, RuntimeError> {
        if num_workers == 0 && kind.requires_threads() {
            return Err(RuntimeError::MissingWorkers(kind));
        }
        let num_workers = num_workers.max(1);

        Ok(match kind {
            PolicyKind::GlobalSingle => Self::GlobalSingle(GlobalSingle::new(num_workers)),
            PolicyKind::PerHostSingle => Self::PerHost(PerHost::new(num_workers, false)),
            PolicyKind::PerHostSteal => Self::PerHost(PerHost::new(num_workers, true)),
            PolicyKind::PerThreadSingle => Self::PerThreadSingle(PerThread::new(num_workers)),
            PolicyKind::PerThreadPerHost => {
                Self::PerThreadPerHost(PerThreadPerHost::new(num_workers))
            }
        })
    }

    /// The kind of this policy.
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::GlobalSingle(_) => PolicyKind::GlobalSingle,
            Self::PerHost(p) if p.is_stealing() => PolicyKind::PerHostSteal,
            Self::PerHost(_) => PolicyKind::PerHostSingle,
            Self::PerThreadSingle(_) => PolicyKind::PerThreadSingle,
            Self::PerThreadPerHost(_) => PolicyKind::PerThreadPerHost,
        }
    }

    /// The number of workers this policy partitions its events for.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        match self {
            Self::GlobalSingle(p) => p.num_workers(),
            Self::PerHost(p) => p.num_workers(),
            Self::PerThreadSingle(p) => p.num_workers(),
            Self::PerThreadPerHost(p) => p.num_workers(),
        }
    }

    /// Registers the next host. Hosts must be added in id order.
    pub fn add_host(&mut self, host: HostId) {
        match self {
            Self::GlobalSingle(p) => p.add_host(host),
            Self::PerHost(p) => p.add_host(host),
            Self::PerThreadSingle(p) => p.add_host(host),
            Self::PerThreadPerHost(p) => p.add_host(host),
        }
    }

    /// The worker a host was assigned to, if the policy assigns hosts.
    #[must_use]
    pub fn worker_of(&self, host: HostId) -> Option<WorkerId> {
        match self {
            Self::GlobalSingle(_) => None,
            Self::PerHost(p) => p.assignment().worker_of(host),
            Self::PerThreadSingle(p) => p.assignment().worker_of(host),
            Self::PerThreadPerHost(p) => p.assignment().worker_of(host),
        }
    }

    ///
    /// Inserts an event into the queue of its host's domain.
    ///
    /// # Panics
    ///
    /// Panics if the destination host was never registered.
    ///
    pub fn push(&self, event: Event) {
        match self {
            Self::GlobalSingle(p) => p.push(event),
            Self::PerHost(p) => p.push(event),
            Self::PerThreadSingle(p) => p.push(event),
            Self::PerThreadPerHost(p) => p.push(event),
        }
    }

    ///
    /// Pops the next event for `worker` that is due strictly before
    /// `barrier`. Returns `None` once the worker's domain has nothing left
    /// below the barrier.
    ///
    pub fn pop(&self, worker: WorkerId, barrier: SimTime) -> Option<Event> {
        match self {
            Self::GlobalSingle(p) => p.pop(barrier),
            Self::PerHost(p) => p.pop(worker, barrier),
            Self::PerThreadSingle(p) => p.pop(worker, barrier),
            Self::PerThreadPerHost(p) => p.pop(worker, barrier),
        }
    }

    /// The minimum time of all queued events, or [`SimTime::MAX`].
    #[must_use]
    pub fn next_time(&self) -> SimTime {
        match self {
            Self::GlobalSingle(p) => p.next_time(),
            Self::PerHost(p) => p.next_time(),
            Self::PerThreadSingle(p) => p.next_time(),
            Self::PerThreadPerHost(p) => p.next_time(),
        }
    }

    /// Resets per-round bookkeeping. Must be called while no worker pops.
    pub fn prepare_round(&self) {
        match self {
            Self::GlobalSingle(_) | Self::PerThreadSingle(_) => {}
            Self::PerHost(p) => p.prepare_round(),
            Self::PerThreadPerHost(p) => p.prepare_round(),
        }
    }

    /// The number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::GlobalSingle(p) => p.len(),
            Self::PerHost(p) => p.len(),
            Self::PerThreadSingle(p) => p.len(),
            Self::PerThreadPerHost(p) => p.len(),
        }
    }

    /// Whether no event is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all queued events without executing them.
    pub fn drain(&self) -> Vec<Event> {
        match self {
            Self::GlobalSingle(p) => p.drain(),
            Self::PerHost(p) => p.drain(),
            Self::PerThreadSingle(p) => p.drain(),
            Self::PerThreadPerHost(p) => p.drain(),
        }
    }

    ///
    /// A section every worker must hold from popping an event until its
    /// execution finished. Only policies that may hand events of one host
    /// to different workers within a round provide one.
    ///
    pub(crate) fn serial_section(&self) -> Option<MutexGuard<'_, ()>> {
        match self {
            Self::GlobalSingle(p) => p.serial_section(),
            _ => None,
        }
    }
}

///
/// A static round-robin assignment of hosts to workers.
///
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    num_workers: usize,
    owners: Vec<WorkerId>,
}

impl Assignment {
    pub(crate) fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            owners: Vec::new(),
        }
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub(crate) fn num_hosts(&self) -> usize {
        self.owners.len()
    }

    pub(crate) fn assign(&mut self, host: HostId) -> WorkerId {
        assert_eq!(host.index(), self.owners.len(), "hosts must be added in id order");
        let worker = host.index() % self.num_workers;
        self.owners.push(worker);
        worker
    }

    pub(crate) fn worker_of(&self, host: HostId) -> Option<WorkerId> {
        self.owners.get(host.index()).copied()
    }

    pub(crate) fn hosts_of(&self, worker: WorkerId) -> impl Iterator<Item = HostId> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter(move |(_, owner)| **owner == worker)
            .map(|(i, _)| HostId::new(u32::try_from(i).unwrap_or(u32::MAX)))
    }
}
