//! Deferred-delivery queue for the message bus.
//!
//! "Scheduling" on the message bus means registering a callback against a
//! future timestamp on the one logical thread this core runs on. The host
//! drives the queue through [`PatchContext::pump`](crate::context::PatchContext::pump),
//! which pops entries one at a time so a delivery may schedule follow-up
//! entries without re-entering the queue borrow.
//!
//! Delivery is best-effort: an entry whose time has passed fires on the
//! next pump, late by however long the host loop was busy. That jitter is
//! accepted by design — sample-accurate scheduling belongs to the signal
//! engine's automation, never to this queue.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::message::Message;

/// Shared handle to a timer queue.
pub type TimerHandle = Rc<RefCell<TimerQueue>>;

/// Identifies the endpoint that owns a set of pending deliveries, so
/// cancellation can be scoped to one endpoint on a shared queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

/// Receives a deferred delivery when its time comes up.
pub trait TimerSink {
    /// Invoked by the pump with the entry's scheduled time and payload.
    fn deliver(&self, time: f64, message: &Message);
}

/// A pending delivery popped from the queue, ready to fire outside the
/// queue borrow.
pub struct TimerEntry {
    due: f64,
    seq: u64,
    owner: OwnerId,
    message: Message,
    sink: Weak<dyn TimerSink>,
}

impl TimerEntry {
    /// The scheduled delivery time in seconds.
    pub fn due(&self) -> f64 {
        self.due
    }

    /// Delivers to the sink. Returns `false` if the sink is gone (its
    /// endpoint was dropped after scheduling).
    pub fn fire(self) -> bool {
        match self.sink.upgrade() {
            Some(sink) => {
                sink.deliver(self.due, &self.message);
                true
            }
            None => false,
        }
    }
}

/// Ordered store of pending deferred deliveries.
pub struct TimerQueue {
    entries: Vec<TimerEntry>,
    next_owner: u64,
    next_seq: u64,
}

impl TimerQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_owner: 0,
            next_seq: 0,
        }
    }

    /// Allocates a fresh owner id for an endpoint.
    pub fn allocate_owner(&mut self) -> OwnerId {
        let owner = OwnerId(self.next_owner);
        self.next_owner += 1;
        owner
    }

    /// Registers a delivery of `message` to `sink` at `due`.
    pub fn schedule(&mut self, owner: OwnerId, due: f64, message: Message, sink: Weak<dyn TimerSink>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(TimerEntry {
            due,
            seq,
            owner,
            message,
            sink,
        });
    }

    /// Removes the owner's pending deliveries due at or after `time`.
    /// Returns how many were removed.
    pub fn cancel_at_or_after(&mut self, owner: OwnerId, time: f64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.owner != owner || entry.due < time);
        before - self.entries.len()
    }

    /// Removes every pending delivery of the owner.
    pub fn cancel_owner(&mut self, owner: OwnerId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.owner != owner);
        before - self.entries.len()
    }

    /// Pops the earliest entry due at or before `now`, in (time, insertion)
    /// order. Returns `None` when nothing is due.
    pub fn pop_due(&mut self, now: f64) -> Option<TimerEntry> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(idx, _)| idx)?;
        Some(self.entries.remove(idx))
    }

    /// Number of pending deliveries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no pending deliveries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending deliveries belonging to `owner`.
    pub fn pending_for(&self, owner: OwnerId) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.owner == owner)
            .count()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(RefCell<Vec<(f64, Message)>>);

    impl TimerSink for Recorder {
        fn deliver(&self, time: f64, message: &Message) {
            self.0.borrow_mut().push((time, message.clone()));
        }
    }

    fn sink() -> Rc<Recorder> {
        Rc::new(Recorder(RefCell::new(Vec::new())))
    }

    #[test]
    fn pops_in_time_then_insertion_order() {
        let mut queue = TimerQueue::new();
        let owner = queue.allocate_owner();
        let recorder = sink();
        let weak = || Rc::downgrade(&recorder) as Weak<dyn TimerSink>;

        queue.schedule(owner, 2.0, Message::from("b"), weak());
        queue.schedule(owner, 1.0, Message::from("a"), weak());
        queue.schedule(owner, 2.0, Message::from("c"), weak());

        while let Some(entry) = queue.pop_due(10.0) {
            entry.fire();
        }
        let fired: Vec<String> = recorder
            .0
            .borrow()
            .iter()
            .map(|(_, m)| m.as_text().unwrap().to_owned())
            .collect();
        assert_eq!(fired, ["a", "b", "c"]);
    }

    #[test]
    fn nothing_due_before_its_time() {
        let mut queue = TimerQueue::new();
        let owner = queue.allocate_owner();
        let recorder = sink();
        queue.schedule(owner, 5.0, Message::Number(1.0), Rc::downgrade(&recorder) as _);
        assert!(queue.pop_due(4.99).is_none());
        assert!(queue.pop_due(5.0).is_some());
    }

    #[test]
    fn cancel_at_or_after_is_inclusive() {
        let mut queue = TimerQueue::new();
        let owner = queue.allocate_owner();
        let recorder = sink();
        let weak = || Rc::downgrade(&recorder) as Weak<dyn TimerSink>;

        queue.schedule(owner, 1.0, Message::Number(1.0), weak());
        queue.schedule(owner, 2.0, Message::Number(2.0), weak());
        queue.schedule(owner, 3.0, Message::Number(3.0), weak());

        let removed = queue.cancel_at_or_after(owner, 2.0);
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_due(10.0).unwrap().due(), 1.0);
    }

    #[test]
    fn cancellation_is_scoped_to_the_owner() {
        let mut queue = TimerQueue::new();
        let a = queue.allocate_owner();
        let b = queue.allocate_owner();
        let recorder = sink();
        let weak = || Rc::downgrade(&recorder) as Weak<dyn TimerSink>;

        queue.schedule(a, 1.0, Message::Number(1.0), weak());
        queue.schedule(b, 1.0, Message::Number(2.0), weak());
        queue.cancel_at_or_after(a, 0.0);
        assert_eq!(queue.pending_for(a), 0);
        assert_eq!(queue.pending_for(b), 1);
    }

    #[test]
    fn dropped_sink_is_a_silent_miss() {
        let mut queue = TimerQueue::new();
        let owner = queue.allocate_owner();
        let recorder = sink();
        queue.schedule(owner, 1.0, Message::Number(1.0), Rc::downgrade(&recorder) as _);
        drop(recorder);
        let entry = queue.pop_due(2.0).unwrap();
        assert!(!entry.fire());
    }
}
