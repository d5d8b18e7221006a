//!
//! Events, tasks and the time-ordered queues holding them.
//!
//! An [`Event`] binds a shared [`Task`] to a host and a point of simulated
//! time. All queues in the crate order events by their [`EventKey`], so
//! execution order never depends on the scheduler policy in use.
//!

use crate::{host::HostId, runtime::HostContext, time::SimTime};
use std::{cmp::Ordering, fmt::Debug};

mod task;
pub use self::task::*;

mod queue;
pub use self::queue::*;

///
/// The producer of an event.
///
/// Every origin numbers the events it pushes with its own monotonic
/// counter, thus no sequence counter is ever shared between threads.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    /// Scheduled from outside any host, e.g. while bootstrapping.
    Engine,
    /// Scheduled by a task executing on the given host.
    Host(HostId),
}

///
/// The ordering key of an event.
///
/// Keys are compared lexicographically by time, then by sequence
/// (push order within an origin), then by origin. This is the single
/// comparator behind every event queue.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// When the event should be executed.
    pub time: SimTime,
    /// Push order of the event within its origin.
    pub sequence: u64,
    /// The producer of the event.
    pub origin: Origin,
}

///
/// A schedulable wrapper around a [`Task`], bound to a host.
///
/// Events have a single owner at any time: the queue, the worker
/// executing it, or nobody once it was executed or dropped.
///
pub struct Event {
    task: Task,
    host: HostId,
    key: EventKey,
}

impl Event {
    /// Creates a new event scheduled from outside any host.
    pub fn new(task: Task, host: HostId, time: SimTime, sequence: u64) -> Self {
        Self {
            task,
            host,
            key: EventKey {
                time,
                sequence,
                origin: Origin::Engine,
            },
        }
    }

    /// Creates a new event scheduled by a task running on `origin`.
    pub fn from_host(
        task: Task,
        host: HostId,
        time: SimTime,
        origin: HostId,
        sequence: u64,
    ) -> Self {
        Self {
            task,
            host,
            key: EventKey {
                time,
                sequence,
                origin: Origin::Host(origin),
            },
        }
    }

    /// The time at which the event is to be executed.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.key.time
    }

    /// The host the event executes on.
    #[must_use]
    pub fn host(&self) -> HostId {
        self.host
    }

    /// The push sequence number of the event within its origin.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.key.sequence
    }

    /// The producer of the event.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.key.origin
    }

    /// The ordering key of the event.
    #[must_use]
    pub fn key(&self) -> EventKey {
        self.key
    }

    /// The task carried by this event.
    #[must_use]
    pub fn task(&self) -> &Task {
        &self.task
    }

    // Only used to defer events, never to move them backwards.
    pub(crate) fn set_time(&mut self, time: SimTime) {
        debug_assert!(time >= self.key.time, "events are never moved backwards");
        self.key.time = time;
    }

    /// Invokes the task of this event against its host.
    pub fn execute(&self, ctx: &mut HostContext<'_>) {
        self.task.execute(ctx);
    }
}

///
/// Compares two events by their [`EventKey`].
///
#[must_use]
pub fn compare(lhs: &Event, rhs: &Event) -> Ordering {
    lhs.key.cmp(&rhs.key)
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("task", &self.task.name())
            .field("host", &self.host)
            .field("time", &self.key.time)
            .field("sequence", &self.key.sequence)
            .field("origin", &self.key.origin)
            .finish()
    }
}
