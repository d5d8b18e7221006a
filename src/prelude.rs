//!
//! Convenience re-export of common members.
//!

pub use crate::event::Event;
pub use crate::event::EventKey;
pub use crate::event::EventQueue;
pub use crate::event::Origin;
pub use crate::event::Task;

pub use crate::host::CpuConfig;
pub use crate::host::HostConfig;
pub use crate::host::HostId;
pub use crate::host::LatencyMatrix;
pub use crate::host::Topology;
pub use crate::host::UniformLatency;

pub use crate::policy::PolicyKind;
pub use crate::policy::SchedulerPolicy;

pub use crate::runtime::Builder;
pub use crate::runtime::Config;
pub use crate::runtime::Engine;
pub use crate::runtime::EngineState;
pub use crate::runtime::HostContext;
pub use crate::runtime::Profiler;
pub use crate::runtime::RuntimeError;
pub use crate::runtime::RuntimeLimit;
pub use crate::runtime::RuntimeResult;

pub use crate::time::Duration;
pub use crate::time::SimTime;
