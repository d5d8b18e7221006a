use crate::{
    event::{Event, EventQueue},
    host::HostId,
    sync::{self, Mutex},
    time::SimTime,
};
use std::sync::MutexGuard;

///
/// A single queue shared by all workers.
///
/// Since consecutive events of one host may be popped by different
/// workers, execution is serialised through [`GlobalSingle::serial_section`]
/// once more than one worker exists.
///
#[derive(Debug)]
pub struct GlobalSingle {
    queue: Mutex<EventQueue>,
    section: Option<std::sync::Mutex<()>>,
    num_workers: usize,
    num_hosts: usize,
}

impl GlobalSingle {
    pub(crate) fn new(num_workers: usize) -> Self {
        Self {
            queue: Mutex::new(EventQueue::new()),
            section: (num_workers > 1).then(|| std::sync::Mutex::new(())),
            num_workers,
            num_hosts: 0,
        }
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub(crate) fn add_host(&mut self, host: HostId) {
        assert_eq!(host.index(), self.num_hosts, "hosts must be added in id order");
        self.num_hosts += 1;
    }

    pub(crate) fn push(&self, event: Event) {
        assert!(
            event.host().index() < self.num_hosts,
            "event for unregistered host {}",
            event.host()
        );
        self.queue.lock().push(event);
    }

    pub(crate) fn pop(&self, barrier: SimTime) -> Option<Event> {
        self.queue.lock().pop_before(barrier)
    }

    pub(crate) fn next_time(&self) -> SimTime {
        self.queue.lock().next_time()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn drain(&self) -> Vec<Event> {
        self.queue.lock().drain().collect()
    }

    pub(crate) fn serial_section(&self) -> Option<MutexGuard<'_, ()>> {
        self.section.as_ref().map(sync::lock)
    }
}
