//!
//! Temporal quantification in a simulation context.
//!
//! A [`SimTime`] is a point on the simulated timeline with nanosecond
//! resolution. Spans of time are expressed as a regular [`Duration`].
//!
//! ```rust
//! # use pdes::time::*;
//! let t = SimTime::from_nanos(1_500);
//! assert_eq!(t + Duration::from_nanos(500), SimTime::from_micros(2));
//! assert!(SimTime::MAX.is_infinite());
//! ```

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Sub};

/// A Duration type to represent a span of time.
pub use std::time::Duration;

///
/// A specific point of time in the simulation, measured in
/// nanoseconds since the simulation started.
///
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SimTime(u64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(0);
    /// The smallest valid instance of a [`SimTime`].
    pub const MIN: SimTime = SimTime(0);
    /// The greatest instance of a [`SimTime`]. Used as the "infinite"
    /// sentinel by empty event domains.
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Creates a time point from raw nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    /// Creates a time point from microseconds.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        SimTime(micros.saturating_mul(1_000))
    }

    /// Creates a time point from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis.saturating_mul(1_000_000))
    }

    /// Creates a time point from seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs.saturating_mul(1_000_000_000))
    }

    ///
    /// Constructs an instance of `SimTime` from a give duration since `SimTime::ZERO`.
    /// Durations beyond the representable range saturate to [`SimTime::MAX`].
    ///
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        SimTime(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
    }

    /// The raw number of nanoseconds since `SimTime::ZERO`.
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whether this time is the infinite sentinel.
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.0 == u64::MAX
    }

    /// Returns `Some(t)` where `t` is the time `self + duration`, or `None`
    /// if the result is not representable.
    #[must_use]
    pub fn checked_add(&self, duration: Duration) -> Option<SimTime> {
        let nanos = u64::try_from(duration.as_nanos()).ok()?;
        self.0.checked_add(nanos).map(SimTime)
    }

    /// Adds a duration, saturating at [`SimTime::MAX`].
    #[must_use]
    pub fn saturating_add(&self, duration: Duration) -> SimTime {
        self.checked_add(duration).unwrap_or(SimTime::MAX)
    }

    /// Returns the amount of time elapsed from another instant to this one,
    /// or None if that instant is later than this one.
    #[must_use]
    pub fn checked_duration_since(&self, earlier: SimTime) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_nanos)
    }

    /// Returns the amount of time elapsed from another instant to this one,
    /// or zero duration if that instant is later than this one.
    #[must_use]
    pub fn saturating_duration_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self.checked_add(rhs)
            .expect("Overflow when adding Duration to SimTime")
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.checked_duration_since(rhs)
            .expect("duration subtraction invalid")
    }
}

impl From<Duration> for SimTime {
    fn from(value: Duration) -> Self {
        Self::from_duration(value)
    }
}

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{:?}", Duration::from_nanos(self.0))
        }
    }
}
