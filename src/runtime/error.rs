use crate::{
    host::HostId,
    policy::PolicyKind,
    time::{Duration, SimTime},
};
use thiserror::Error;

/// An error that prevented a simulation from being built or run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The policy partitions events by worker, but no worker exists.
    #[error("scheduler policy '{0}' requires at least one worker thread")]
    MissingWorkers(PolicyKind),

    /// A configured or derived minimum time jump of zero.
    #[error("minimum time jump must be greater than zero")]
    ZeroTimeJump,

    /// A policy name that does not map to any policy.
    #[error(
        "unknown scheduler policy '{0}' (expected one of global, host, steal, thread, threadXhost)"
    )]
    UnknownPolicy(String),

    /// An event was scheduled for a host that was never registered.
    #[error("no host with id {0} was registered")]
    UnknownHost(HostId),

    /// An event would be scheduled at or beyond [`SimTime::MAX`].
    #[error("delay {delay:?} after {now} exceeds the simulated time range")]
    TimeOverflow {
        /// The time the delay is relative to.
        now: SimTime,
        /// The requested delay.
        delay: Duration,
    },

    /// A configuration document could not be parsed.
    #[cfg(feature = "serde")]
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yml::Error),
}

///
/// A broken scheduling invariant.
///
/// Violations are never corrected. The engine panics with the formatted
/// violation, since continuing would silently corrupt simulation results.
///
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// An event was popped although it lies before the current window.
    #[error("event at {time} popped before window start {start}")]
    BeforeWindow {
        /// The event time.
        time: SimTime,
        /// The start of the window.
        start: SimTime,
    },

    /// An event was popped although it lies at or after the window end.
    #[error("event at {time} popped at or after window end {end}")]
    AfterWindow {
        /// The event time.
        time: SimTime,
        /// The exclusive end of the window.
        end: SimTime,
    },

    /// An event was popped for a host that already handled a later event.
    #[error("event at {time} lies before the watermark {watermark} of {host}")]
    BelowWatermark {
        /// The destination host.
        host: HostId,
        /// The event time.
        time: SimTime,
        /// The time of the latest event handled by the host.
        watermark: SimTime,
    },

    /// An event targets a host that was never registered.
    #[error("event for unregistered host {0}")]
    UnknownHost(HostId),

    /// A task scheduled an event at or beyond [`SimTime::MAX`].
    #[error("event {delay:?} after {now} exceeds the simulated time range")]
    TimeOverflow {
        /// The time of the scheduling task.
        now: SimTime,
        /// The requested delay.
        delay: Duration,
    },
}
