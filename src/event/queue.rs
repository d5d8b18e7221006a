use super::Event;
use crate::time::SimTime;
use std::{cmp::Reverse, collections::BinaryHeap};

///
/// A time-ordered priority queue of events.
///
/// `pop` always yields the minimum event by [`EventKey`](super::EventKey),
/// thus events with equal times leave the queue in the order their origin
/// pushed them.
///
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
}

impl EventQueue {
    /// Creates a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::with_capacity(64),
        }
    }

    /// The number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no event is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts an event in O(log n).
    pub fn push(&mut self, event: Event) {
        self.heap.push(Reverse(event));
    }

    /// Removes the minimum event.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(event)| event)
    }

    /// The minimum event, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|Reverse(event)| event)
    }

    ///
    /// Removes the minimum event only if it is due strictly before
    /// `barrier`. Later events stay queued.
    ///
    pub fn pop_before(&mut self, barrier: SimTime) -> Option<Event> {
        match self.peek() {
            Some(event) if event.time() < barrier => self.pop(),
            _ => None,
        }
    }

    /// The time of the minimum event, or [`SimTime::MAX`] if empty.
    #[must_use]
    pub fn next_time(&self) -> SimTime {
        self.peek().map_or(SimTime::MAX, Event::time)
    }

    /// Removes all events, in no particular order.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.heap.drain().map(|Reverse(event)| event)
    }
}
