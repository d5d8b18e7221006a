use super::{Assignment, WorkerId};
use crate::{
    event::{Event, EventQueue},
    host::HostId,
    sync::Mutex,
    time::SimTime,
};
use std::collections::VecDeque;
use tracing::trace;

///
/// One queue per host, with hosts assigned to workers round-robin.
///
/// Within a round a worker drains its hosts one after another. With
/// stealing enabled, a worker that ran out of hosts claims hosts a peer
/// has not started yet. A claimed host stays with the thief until the
/// round ends, thus a host is never executed by two workers at once.
///
#[derive(Debug)]
pub struct PerHost {
    queues: Vec<Mutex<EventQueue>>,
    workers: Vec<Mutex<WorkerSlot>>,
    assignment: Assignment,
    stealing: bool,
}

#[derive(Debug, Default)]
struct WorkerSlot {
    pending: VecDeque<HostId>,
    current: Option<HostId>,
}

impl PerHost {
    pub(crate) fn new(num_workers: usize, stealing: bool) -> Self {
        Self {
            queues: Vec::new(),
            workers: (0..num_workers)
                .map(|_| Mutex::new(WorkerSlot::default()))
                .collect(),
            assignment: Assignment::new(num_workers),
            stealing,
        }
    }

    pub(crate) fn is_stealing(&self) -> bool {
        self.stealing
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.assignment.num_workers()
    }

    pub(crate) fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub(crate) fn add_host(&mut self, host: HostId) {
        self.assignment.assign(host);
        self.queues.push(Mutex::new(EventQueue::new()));
    }

    fn queue(&self, host: HostId) -> &Mutex<EventQueue> {
        self.queues
            .get(host.index())
            .unwrap_or_else(|| panic!("event for unregistered host {host}"))
    }

    pub(crate) fn push(&self, event: Event) {
        self.queue(event.host()).lock().push(event);
    }

    pub(crate) fn prepare_round(&self) {
        for (worker, slot) in self.workers.iter().enumerate() {
            let mut slot = slot.lock();
            slot.pending.clear();
            slot.pending.extend(self.assignment.hosts_of(worker));
            slot.current = None;
        }
    }

    pub(crate) fn pop(&self, worker: WorkerId, barrier: SimTime) -> Option<Event> {
        loop {
            if let Some(event) = self.pop_own(worker, barrier) {
                return Some(event);
            }
            if !self.stealing {
                return None;
            }

            // The own slot is released here, never hold two slots at once.
            let host = self.steal(worker)?;
            self.workers[worker].lock().current = Some(host);
        }
    }

    fn pop_own(&self, worker: WorkerId, barrier: SimTime) -> Option<Event> {
        let mut slot = self.workers[worker].lock();
        loop {
            if let Some(host) = slot.current {
                if let Some(event) = self.queue(host).lock().pop_before(barrier) {
                    return Some(event);
                }
                slot.current = None;
            }
            slot.current = Some(slot.pending.pop_front()?);
        }
    }

    fn steal(&self, thief: WorkerId) -> Option<HostId> {
        let n = self.workers.len();
        (1..n).map(|offset| (thief + offset) % n).find_map(|victim| {
            let host = self.workers[victim].lock().pending.pop_back()?;
            trace!(thief, victim, %host, "stole host");
            Some(host)
        })
    }

    pub(crate) fn next_time(&self) -> SimTime {
        self.queues
            .iter()
            .map(|q| q.lock().next_time())
            .min()
            .unwrap_or(SimTime::MAX)
    }

    pub(crate) fn len(&self) -> usize {
        self.queues.iter().map(|q| q.lock().len()).sum()
    }

    pub(crate) fn drain(&self) -> Vec<Event> {
        self.queues
            .iter()
            .flat_map(|q| q.lock().drain().collect::<Vec<_>>())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Task;

    fn setup(stealing: bool) -> (PerHost, Task) {
        let mut policy = PerHost::new(2, stealing);
        for i in 0..4 {
            policy.add_host(HostId::new(i));
        }
        let task = Task::new(|_| {});
        for (seq, host) in [0, 1, 2, 3, 0, 2].into_iter().enumerate() {
            policy.push(Event::new(
                task.clone(),
                HostId::new(host),
                SimTime::from_nanos(seq as u64),
                seq as u64,
            ));
        }
        policy.prepare_round();
        (policy, task)
    }

    fn hosts(policy: &PerHost, worker: WorkerId) -> Vec<u32> {
        std::iter::from_fn(|| policy.pop(worker, SimTime::MAX))
            .map(|e| e.host().index() as u32)
            .collect()
    }

    #[test]
    fn workers_drain_their_hosts_in_turn() {
        let (policy, _task) = setup(false);
        assert_eq!(hosts(&policy, 0), vec![0, 0, 2, 2]);
        assert_eq!(hosts(&policy, 1), vec![1, 3]);
    }

    #[test]
    fn idle_workers_steal_pending_hosts() {
        let (policy, _task) = setup(true);

        assert_eq!(policy.pop(1, SimTime::MAX).map(|e| e.host()), Some(HostId::new(1)));
        // Worker 0 never started, all of its hosts are claimed by worker 1.
        assert_eq!(hosts(&policy, 1), vec![3, 2, 2, 0, 0]);
        assert_eq!(hosts(&policy, 0), Vec::<u32>::new());
    }

    #[test]
    fn claimed_hosts_stay_with_their_worker() {
        let (policy, _task) = setup(true);

        assert_eq!(policy.pop(0, SimTime::MAX).map(|e| e.host()), Some(HostId::new(0)));
        // Host 0 is current for worker 0, thus never stolen.
        assert_eq!(hosts(&policy, 1), vec![1, 3, 2, 2]);
        assert_eq!(hosts(&policy, 0), vec![0]);
    }
}
