use crate::policy::PolicyKind;

///
/// The scheduling configuration of an engine.
///
/// With the `serde` feature a configuration can be loaded from a YAML
/// document. Missing fields take their default value.
///
/// ```
/// # use pdes::prelude::*;
/// # #[cfg(feature = "serde")] {
/// let config = Config::from_yaml_str(
///     "num_worker_threads: 4\nscheduler_policy: steal\nseed: 42\n",
/// ).unwrap();
/// assert_eq!(config.num_worker_threads, 4);
/// assert_eq!(config.scheduler_policy, PolicyKind::PerHostSteal);
/// assert_eq!(config.min_time_jump_ns, None);
/// # }
/// ```
///
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct Config {
    /// The number of worker threads. Zero and one both execute all
    /// rounds on the calling thread.
    pub num_worker_threads: usize,
    /// An upper bound on the window length, in nanoseconds.
    pub min_time_jump_ns: Option<u64>,
    /// The policy distributing events onto workers.
    pub scheduler_policy: PolicyKind,
    /// The seed of all host-local random number generators.
    pub seed: u64,
    /// No event later than this time is executed, in nanoseconds.
    pub stop_time_ns: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_worker_threads: 1,
            min_time_jump_ns: None,
            scheduler_policy: PolicyKind::default(),
            seed: 0,
            stop_time_ns: None,
        }
    }
}

#[cfg(feature = "serde")]
impl Config {
    ///
    /// Parses a configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`](super::RuntimeError::Config) if
    /// the document is malformed or contains unknown fields or policies.
    ///
    pub fn from_yaml_str(s: &str) -> Result<Self, super::RuntimeError> {
        Ok(serde_yml::from_str(s)?)
    }
}
