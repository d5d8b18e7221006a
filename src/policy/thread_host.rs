use super::{Assignment, WorkerId};
use crate::{
    event::{Event, EventQueue},
    host::HostId,
    sync::Mutex,
    time::SimTime,
};
use fxhash::FxHashMap;

///
/// One lock per worker, guarding the queues of all hosts that worker owns.
///
/// Within a round, a worker drains its hosts in registration order, one
/// host at a time.
///
#[derive(Debug)]
pub struct PerThreadPerHost {
    threads: Vec<Mutex<ThreadQueues>>,
    assignment: Assignment,
}

#[derive(Debug, Default)]
struct ThreadQueues {
    queues: FxHashMap<HostId, EventQueue>,
    hosts: Vec<HostId>,
    cursor: usize,
}

impl PerThreadPerHost {
    pub(crate) fn new(num_workers: usize) -> Self {
        Self {
            threads: (0..num_workers)
                .map(|_| Mutex::new(ThreadQueues::default()))
                .collect(),
            assignment: Assignment::new(num_workers),
        }
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.threads.len()
    }

    pub(crate) fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub(crate) fn add_host(&mut self, host: HostId) {
        let worker = self.assignment.assign(host);
        let thread = self.threads[worker].get_mut();
        thread.queues.insert(host, EventQueue::new());
        thread.hosts.push(host);
    }

    pub(crate) fn push(&self, event: Event) {
        let host = event.host();
        let Some(worker) = self.assignment.worker_of(host) else {
            panic!("event for unregistered host {host}")
        };
        self.threads[worker]
            .lock()
            .queues
            .entry(host)
            .or_default()
            .push(event);
    }

    pub(crate) fn prepare_round(&self) {
        for thread in &self.threads {
            thread.lock().cursor = 0;
        }
    }

    pub(crate) fn pop(&self, worker: WorkerId, barrier: SimTime) -> Option<Event> {
        let mut thread = self.threads[worker].lock();
        let ThreadQueues {
            queues,
            hosts,
            cursor,
        } = &mut *thread;

        while let Some(host) = hosts.get(*cursor) {
            if let Some(event) = queues.get_mut(host).and_then(|q| q.pop_before(barrier)) {
                return Some(event);
            }
            *cursor += 1;
        }
        None
    }

    pub(crate) fn next_time(&self) -> SimTime {
        self.threads
            .iter()
            .flat_map(|t| {
                t.lock()
                    .queues
                    .values()
                    .map(EventQueue::next_time)
                    .collect::<Vec<_>>()
            })
            .min()
            .unwrap_or(SimTime::MAX)
    }

    pub(crate) fn len(&self) -> usize {
        self.threads
            .iter()
            .map(|t| t.lock().queues.values().map(EventQueue::len).sum::<usize>())
            .sum()
    }

    pub(crate) fn drain(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for thread in &self.threads {
            for queue in thread.lock().queues.values_mut() {
                events.extend(queue.drain());
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Task;

    #[test]
    fn drains_host_by_host() {
        let mut policy = PerThreadPerHost::new(1);
        for i in 0..3 {
            policy.add_host(HostId::new(i));
        }

        let task = Task::new(|_| {});
        for (seq, (host, time)) in [(2, 1), (0, 5), (1, 2), (0, 3)].into_iter().enumerate() {
            policy.push(Event::new(
                task.clone(),
                HostId::new(host),
                SimTime::from_nanos(time),
                seq as u64,
            ));
        }
        policy.prepare_round();

        let order = std::iter::from_fn(|| policy.pop(0, SimTime::MAX))
            .map(|e| (e.host().index(), e.time().as_nanos()))
            .collect::<Vec<_>>();
        assert_eq!(order, vec![(0, 3), (0, 5), (1, 2), (2, 1)]);
    }

    #[test]
    fn cursor_resets_each_round() {
        let mut policy = PerThreadPerHost::new(1);
        policy.add_host(HostId::new(0));
        policy.add_host(HostId::new(1));
        policy.prepare_round();

        let task = Task::new(|_| {});
        policy.push(Event::new(task.clone(), HostId::new(1), SimTime::from_nanos(1), 0));
        assert!(policy.pop(0, SimTime::MAX).is_some());
        policy.push(Event::new(task, HostId::new(0), SimTime::from_nanos(2), 1));
        assert!(policy.pop(0, SimTime::MAX).is_none());

        policy.prepare_round();
        assert_eq!(policy.pop(0, SimTime::MAX).map(|e| e.time()), Some(SimTime::from_nanos(2)));
    }
}
