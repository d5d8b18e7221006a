//!
//! Simulated hosts and the collaborators attached to them.
//!

use crate::time::SimTime;
use rand::{rngs::StdRng, SeedableRng};
use std::{fmt::Display, sync::Arc};

mod cpu;
pub use self::cpu::*;

mod topology;
pub use self::topology::*;

///
/// A runtime unique identifier of a host.
///
/// Host ids are handed out in registration order, starting at zero.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostId(u32);

impl HostId {
    /// Creates a host id from its raw index.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The registration index of the host.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

///
/// The description of a host, used when registering it at the engine.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// A human readable name, used in log output.
    pub name: String,
    /// The virtual processor of the host.
    pub cpu: CpuConfig,
}

impl HostConfig {
    /// A host with the given name and an unthrottled CPU.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpu: CpuConfig::default(),
        }
    }

    /// Replaces the CPU configuration.
    #[must_use]
    pub fn cpu(mut self, cpu: CpuConfig) -> Self {
        self.cpu = cpu;
        self
    }
}

///
/// The engine-side state of a simulated host.
///
/// At any instant a host is owned by at most one worker; the engine keeps
/// each host behind its own lock and only the owning worker takes it.
///
#[derive(Debug)]
pub struct Host {
    id: HostId,
    name: Arc<str>,
    pub(crate) cpu: Cpu,
    pub(crate) rng: StdRng,

    // The time of the last event popped for this host.
    watermark: SimTime,
    next_sequence: u64,

    pub(crate) executed: usize,
}

impl Host {
    pub(crate) fn new(id: HostId, config: HostConfig, seed: u64) -> Self {
        Self {
            id,
            name: config.name.into(),
            cpu: Cpu::new(config.cpu),
            rng: StdRng::seed_from_u64(seed ^ ((u64::from(id.0) << 32) | u64::from(id.0))),
            watermark: SimTime::MIN,
            next_sequence: 0,
            executed: 0,
        }
    }

    /// The id of the host.
    #[must_use]
    pub fn id(&self) -> HostId {
        self.id
    }

    /// The name of the host.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// The time of the latest event handled by this host.
    #[must_use]
    pub fn watermark(&self) -> SimTime {
        self.watermark
    }

    /// The number of tasks executed on this host.
    #[must_use]
    pub fn num_events_executed(&self) -> usize {
        self.executed
    }

    /// The virtual processor of this host.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    ///
    /// Advances the watermark to `time`. Returns the previous watermark
    /// as an error if `time` lies before it.
    ///
    pub(crate) fn advance_watermark(&mut self, time: SimTime) -> Result<(), SimTime> {
        if time < self.watermark {
            return Err(self.watermark);
        }
        self.watermark = time;
        Ok(())
    }

    pub(crate) fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }
}
