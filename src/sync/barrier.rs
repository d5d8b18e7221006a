use std::sync::Barrier;

///
/// A reusable two-phase barrier between the coordinator and its workers.
///
/// Each round passes both phases exactly once:
///
/// 1. release: the coordinator published the next window, all workers
///    start executing.
/// 2. join: every worker drained its domain up to the window end, the
///    coordinator may compute the next window.
///
#[derive(Debug)]
pub(crate) struct RoundBarrier {
    release: Barrier,
    join: Barrier,
}

impl RoundBarrier {
    /// Creates a barrier for `workers` workers plus one coordinator.
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            release: Barrier::new(workers + 1),
            join: Barrier::new(workers + 1),
        }
    }

    /// Coordinator side: starts the round.
    pub(crate) fn release(&self) {
        self.release.wait();
    }

    /// Coordinator side: waits until every worker finished the round.
    pub(crate) fn join(&self) {
        self.join.wait();
    }

    /// Worker side: waits for the next round to be released.
    pub(crate) fn await_release(&self) {
        self.release.wait();
    }

    /// Worker side: reports the domain as drained.
    pub(crate) fn report_drained(&self) {
        self.join.wait();
    }
}
