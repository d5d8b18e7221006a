use crate::time::SimTime;
use std::{fmt::Display, mem};

///
/// A composed limit that terminates the event execution of
/// an engine.
///
/// Limits are evaluated at round boundaries. A time bound additionally
/// caps the end of every window, so no event later than the bound is ever
/// executed.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeLimit {
    /// A unbounded runtime. An engine with this limit will
    /// only finish if the all events are handled and no new
    /// events have been created.
    None,

    /// A bound based on the number of executed events.
    /// The engine stops before the first round that starts with at
    /// least this number of events executed. Since whole rounds are
    /// executed, the bound may be exceeded by the last round.
    EventCount(usize),

    /// A bound based on the simulation time.
    /// An engine with this bound will terminate after no events
    /// scheduled at or before the given simulation time are left.
    SimTime(SimTime),

    /// This bound combines two other bounds with a logical AND.
    /// This will only terminated the simulation if both given
    /// limits are fulfilled.
    CombinedAnd(Box<RuntimeLimit>, Box<RuntimeLimit>),

    /// This bound combines two other bounds with a logical OR.
    /// This will terminated the simulation if one of given
    /// limits is fulfilled.
    CombinedOr(Box<RuntimeLimit>, Box<RuntimeLimit>),
}

impl RuntimeLimit {
    pub(crate) fn applies(&self, itr_count: usize, time: SimTime) -> bool {
        match self {
            Self::None => false,

            Self::EventCount(e) => itr_count > *e,
            Self::SimTime(t) => time > *t,

            Self::CombinedAnd(lhs, rhs) => {
                lhs.applies(itr_count, time) && rhs.applies(itr_count, time)
            }
            Self::CombinedOr(lhs, rhs) => {
                lhs.applies(itr_count, time) || rhs.applies(itr_count, time)
            }
        }
    }

    ///
    /// The latest time an event may be executed at, if only time bounds
    /// are considered. `None` if the limit never stops on time alone.
    ///
    pub(crate) fn time_bound(&self) -> Option<SimTime> {
        match self {
            Self::None | Self::EventCount(_) => None,
            Self::SimTime(t) => Some(*t),

            Self::CombinedAnd(lhs, rhs) => match (lhs.time_bound(), rhs.time_bound()) {
                (Some(l), Some(r)) => Some(l.max(r)),
                _ => None,
            },
            Self::CombinedOr(lhs, rhs) => match (lhs.time_bound(), rhs.time_bound()) {
                (Some(l), Some(r)) => Some(l.min(r)),
                (bound, None) | (None, bound) => bound,
            },
        }
    }

    pub(crate) fn add(&mut self, limit: RuntimeLimit) {
        if matches!(self, Self::None) {
            *self = limit;
        } else {
            let other = mem::replace(self, Self::None);
            *self = Self::CombinedOr(Box::new(other), Box::new(limit));
        }
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),

            Self::EventCount(e) => write!(f, "MaxEventCount({e})"),
            Self::SimTime(t) => write!(f, "MaxSimTime({t})"),

            Self::CombinedAnd(lhs, rhs) => write!(f, "{lhs} and {rhs}"),
            Self::CombinedOr(lhs, rhs) => write!(f, "{lhs} or {rhs}"),
        }
    }
}
