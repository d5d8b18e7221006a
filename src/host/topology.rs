use super::HostId;
use crate::time::Duration;
use fxhash::FxHashMap;
use std::fmt::Debug;

///
/// The network topology as seen by the scheduler.
///
/// The engine only needs a lower bound on the latency between any two
/// hosts. The smallest such bound over all registered hosts limits how
/// far a single execution window may reach.
///
pub trait Topology: Send + Sync + Debug {
    /// The minimum latency of any path from `src` to `dst`.
    fn min_latency_between(&self, src: HostId, dst: HostId) -> Duration;
}

///
/// A topology where every pair of distinct hosts is connected with the
/// same latency.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLatency(pub Duration);

impl Topology for UniformLatency {
    fn min_latency_between(&self, _: HostId, _: HostId) -> Duration {
        self.0
    }
}

///
/// A topology defined by explicit pairwise latencies.
///
/// Links are symmetric; pairs without a link fall back to the
/// default latency.
///
#[derive(Debug, Clone)]
pub struct LatencyMatrix {
    default: Duration,
    links: FxHashMap<(HostId, HostId), Duration>,
}

impl LatencyMatrix {
    /// Creates a matrix where unknown pairs have the latency `default`.
    #[must_use]
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            links: FxHashMap::default(),
        }
    }

    /// Sets the latency between `a` and `b` in both directions.
    #[must_use]
    pub fn link(mut self, a: HostId, b: HostId, latency: Duration) -> Self {
        self.links.insert(Self::normalize(a, b), latency);
        self
    }

    fn normalize(a: HostId, b: HostId) -> (HostId, HostId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl Topology for LatencyMatrix {
    fn min_latency_between(&self, src: HostId, dst: HostId) -> Duration {
        self.links
            .get(&Self::normalize(src, dst))
            .copied()
            .unwrap_or(self.default)
    }
}

///
/// The smallest latency between any two distinct hosts, or `None`
/// if fewer than two hosts exist.
///
pub(crate) fn min_latency(topology: &dyn Topology, num_hosts: usize) -> Option<Duration> {
    let ids = (0..num_hosts)
        .map(|i| HostId::new(u32::try_from(i).unwrap_or(u32::MAX)))
        .collect::<Vec<_>>();

    ids.iter()
        .flat_map(|&a| ids.iter().filter(move |&&b| b != a).map(move |&b| (a, b)))
        .map(|(a, b)| topology.min_latency_between(a, b))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_symmetric() {
        let matrix = LatencyMatrix::new(Duration::from_millis(10)).link(
            HostId::new(2),
            HostId::new(0),
            Duration::from_millis(3),
        );

        let a = HostId::new(0);
        let b = HostId::new(2);
        assert_eq!(matrix.min_latency_between(a, b), Duration::from_millis(3));
        assert_eq!(matrix.min_latency_between(b, a), Duration::from_millis(3));
        assert_eq!(
            matrix.min_latency_between(a, HostId::new(1)),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn min_latency_over_pairs() {
        let matrix = LatencyMatrix::new(Duration::from_millis(10))
            .link(HostId::new(1), HostId::new(2), Duration::from_micros(250));

        assert_eq!(min_latency(&matrix, 0), None);
        assert_eq!(min_latency(&matrix, 1), None);
        assert_eq!(min_latency(&matrix, 2), Some(Duration::from_millis(10)));
        assert_eq!(min_latency(&matrix, 3), Some(Duration::from_micros(250)));
    }
}
