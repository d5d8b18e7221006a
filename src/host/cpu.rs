use crate::time::{Duration, SimTime};

///
/// The configuration of a virtual processor.
///
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuConfig {
    /// The speed of the simulated processor.
    pub frequency_khz: u64,
    /// The speed of the physical processor that measured the
    /// consumed processing time.
    pub raw_frequency_khz: u64,
    /// The amount of built-up delay a host may carry before it is
    /// blocked. `None` disables blocking altogether.
    pub threshold: Option<Duration>,
    /// Consumed time is rounded to a multiple of this interval.
    pub precision: Option<Duration>,
}

impl CpuConfig {
    /// A processor as fast as the machine running the simulation,
    /// that blocks once more than `threshold` of delay is built up.
    #[must_use]
    pub fn throttled(threshold: Duration) -> Self {
        Self {
            threshold: Some(threshold),
            ..Self::default()
        }
    }

    /// Sets the virtual and physical processor speeds.
    #[must_use]
    pub fn frequency(mut self, frequency_khz: u64, raw_frequency_khz: u64) -> Self {
        self.frequency_khz = frequency_khz;
        self.raw_frequency_khz = raw_frequency_khz;
        self
    }

    /// Sets the rounding precision for consumed time.
    #[must_use]
    pub fn precision(mut self, precision: Duration) -> Self {
        self.precision = Some(precision);
        self
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            frequency_khz: 1_000_000,
            raw_frequency_khz: 1_000_000,
            threshold: None,
            precision: None,
        }
    }
}

///
/// A virtual processor, tracking until when a host is busy.
///
/// Tasks consume processing time through
/// [`HostContext::consume_cpu`](crate::runtime::HostContext::consume_cpu).
/// Once the built-up delay exceeds the threshold, the host is blocked and
/// the engine defers its events until the processor becomes available.
///
#[derive(Debug, Clone)]
pub struct Cpu {
    frequency_ratio: f64,
    threshold: Option<u64>,
    precision: u64,

    now: SimTime,
    available: SimTime,
}

impl Cpu {
    /// Creates a new processor from a configuration.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(config: CpuConfig) -> Self {
        let frequency_ratio = if config.frequency_khz == 0 {
            1.0
        } else {
            config.raw_frequency_khz as f64 / config.frequency_khz as f64
        };

        Self {
            frequency_ratio,
            threshold: config.threshold.map(duration_nanos),
            precision: config.precision.map_or(0, duration_nanos),
            now: SimTime::ZERO,
            available: SimTime::ZERO,
        }
    }

    /// A processor that never blocks.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(CpuConfig::default())
    }

    /// The time at which the processor becomes idle.
    #[must_use]
    pub fn available_at(&self) -> SimTime {
        self.available
    }

    /// Moves the processor clock to `now`. A processor is never
    /// available before the current time.
    pub fn update_time(&mut self, now: SimTime) {
        self.now = now;
        self.available = self.available.max(now);
    }

    ///
    /// Accounts processing time measured on the physical processor.
    /// The time is scaled to the virtual processor speed and rounded
    /// to the configured precision.
    ///
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn add_delay(&mut self, delay: Duration) {
        let mut adjusted = (self.frequency_ratio * duration_nanos(delay) as f64) as u64;

        if self.precision > 0 {
            let remainder = adjusted % self.precision;
            adjusted -= remainder;
            if remainder >= self.precision / 2 {
                adjusted += self.precision;
            }
        }

        let base = self.available.max(self.now);
        self.available = SimTime::from_nanos(base.as_nanos().saturating_add(adjusted));
    }

    /// The built-up delay, if it exceeds the threshold. Zero otherwise.
    #[must_use]
    pub fn delay(&self) -> Duration {
        let Some(threshold) = self.threshold else {
            return Duration::ZERO;
        };

        let built_up = self.available.as_nanos().saturating_sub(self.now.as_nanos());
        if built_up > threshold {
            Duration::from_nanos(built_up)
        } else {
            Duration::ZERO
        }
    }

    /// Whether the processor is too busy to execute anything right now.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.delay() > Duration::ZERO
    }

    ///
    /// Moves the processor clock to `now` and returns the time remaining
    /// until the processor becomes idle.
    ///
    pub fn adjust_delay(&mut self, now: SimTime) -> Duration {
        self.update_time(now);
        self.available.saturating_duration_since(now)
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_cpu_never_blocks() {
        let mut cpu = Cpu::disabled();
        cpu.update_time(SimTime::from_nanos(100));
        cpu.add_delay(Duration::from_secs(10));
        assert!(!cpu.is_blocked());
        assert_eq!(cpu.delay(), Duration::ZERO);
        assert_eq!(cpu.adjust_delay(SimTime::from_nanos(100)), Duration::from_secs(10));
    }

    #[test]
    fn blocks_beyond_threshold() {
        let mut cpu = Cpu::new(CpuConfig::throttled(Duration::from_nanos(100)));
        cpu.update_time(SimTime::ZERO);
        cpu.add_delay(Duration::from_nanos(100));
        assert!(!cpu.is_blocked());

        cpu.add_delay(Duration::from_nanos(1));
        assert!(cpu.is_blocked());
        assert_eq!(cpu.delay(), Duration::from_nanos(101));

        cpu.update_time(SimTime::from_nanos(101));
        assert!(!cpu.is_blocked());
    }

    #[test]
    fn adjust_delay_clamps_to_now() {
        let mut cpu = Cpu::new(CpuConfig::throttled(Duration::ZERO));
        cpu.update_time(SimTime::ZERO);
        cpu.add_delay(Duration::from_nanos(1_100));

        assert_eq!(cpu.adjust_delay(SimTime::from_nanos(100)), Duration::from_nanos(1_000));
        assert_eq!(cpu.adjust_delay(SimTime::from_nanos(5_000)), Duration::ZERO);
        assert_eq!(cpu.available_at(), SimTime::from_nanos(5_000));
    }

    #[test]
    fn frequency_scaling() {
        // Simulated processor is half as fast as the physical one.
        let mut cpu = Cpu::new(CpuConfig::throttled(Duration::ZERO).frequency(1_000, 2_000));
        cpu.update_time(SimTime::ZERO);
        cpu.add_delay(Duration::from_nanos(500));
        assert_eq!(cpu.available_at(), SimTime::from_nanos(1_000));
    }

    #[test]
    fn precision_rounds_half_up() {
        let config = CpuConfig::throttled(Duration::ZERO).precision(Duration::from_nanos(100));

        let mut cpu = Cpu::new(config.clone());
        cpu.add_delay(Duration::from_nanos(149));
        assert_eq!(cpu.available_at(), SimTime::from_nanos(100));

        let mut cpu = Cpu::new(config);
        cpu.add_delay(Duration::from_nanos(150));
        assert_eq!(cpu.available_at(), SimTime::from_nanos(200));
    }
}
