use super::{Assignment, WorkerId};
use crate::{
    event::{Event, EventQueue},
    host::HostId,
    sync::Mutex,
    time::SimTime,
};

///
/// One queue per worker. Events are pushed into the queue of the worker
/// that owns the destination host.
///
#[derive(Debug)]
pub struct PerThread {
    queues: Vec<Mutex<EventQueue>>,
    assignment: Assignment,
}

impl PerThread {
    pub(crate) fn new(num_workers: usize) -> Self {
        Self {
            queues: (0..num_workers)
                .map(|_| Mutex::new(EventQueue::new()))
                .collect(),
            assignment: Assignment::new(num_workers),
        }
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.queues.len()
    }

    pub(crate) fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub(crate) fn add_host(&mut self, host: HostId) {
        self.assignment.assign(host);
    }

    pub(crate) fn push(&self, event: Event) {
        let host = event.host();
        let Some(worker) = self.assignment.worker_of(host) else {
            panic!("event for unregistered host {host}")
        };
        self.queues[worker].lock().push(event);
    }

    pub(crate) fn pop(&self, worker: WorkerId, barrier: SimTime) -> Option<Event> {
        self.queues[worker].lock().pop_before(barrier)
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
