//! The sending side of the message bus.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::EngineHandle;
use crate::message::Message;

use super::input::MessageDestination;

/// A scheduled `{time, message}` event in an output's log.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Scheduled delivery time on the engine clock, in seconds.
    pub time: f64,
    /// The payload.
    pub message: Message,
}

/// Schedules timestamped events and fans them out to connected
/// destinations.
///
/// The node keeps two pieces of state: the ordered destination list (no
/// deduplication — connecting the same destination twice produces double
/// fan-out, by design) and a log of scheduled events. The log exists for
/// **replay-on-connect**: a destination that joins while the clock is
/// still at or before an event's time receives that event, so a module
/// patched in mid-performance does not miss what is already queued.
/// Events whose time has passed can never be replayed and are pruned as a
/// side effect of scheduling and connecting, which bounds the log to the
/// pending-future horizon.
///
/// Each destination is independently responsible for arranging its own
/// delivery (timer queue or engine automation); this node only forwards.
pub struct MessageOutputNode {
    engine: EngineHandle,
    destinations: RefCell<Vec<Rc<dyn MessageDestination>>>,
    events: RefCell<Vec<MessageEvent>>,
}

impl MessageOutputNode {
    /// Creates an output node reading its reference clock from `engine`.
    pub fn new(engine: EngineHandle) -> Rc<Self> {
        Rc::new(Self {
            engine,
            destinations: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
        })
    }

    /// Adds a destination to the fan-out list, first replaying every
    /// logged event whose time is still at or after the current clock.
    pub fn connect(&self, destination: Rc<dyn MessageDestination>) {
        let now = self.engine.borrow().now();
        self.prune_past(now);
        for event in self.events.borrow().iter() {
            if event.time >= now {
                destination.schedule_message_callback(event.time, &event.message);
            }
        }
        self.destinations.borrow_mut().push(destination);
    }

    /// Removes one destination from the fan-out list, instructing it
    /// first to cancel callbacks from the current clock onward so a torn
    /// down link produces no stray deliveries.
    pub fn disconnect(&self, destination: &Rc<dyn MessageDestination>) {
        let now = self.engine.borrow().now();
        destination.cancel_scheduled_message_callbacks(now);
        self.destinations
            .borrow_mut()
            .retain(|dest| !std::ptr::addr_eq(Rc::as_ptr(dest), Rc::as_ptr(destination)));
    }

    /// Removes every destination, cancelling each from the current clock
    /// onward.
    pub fn disconnect_all(&self) {
        let now = self.engine.borrow().now();
        let destinations = self.destinations.borrow().clone();
        for destination in &destinations {
            destination.cancel_scheduled_message_callbacks(now);
        }
        self.destinations.borrow_mut().clear();
    }

    /// Logs `{time, message}` and forwards it to every connected
    /// destination.
    pub fn schedule_message(&self, time: f64, message: Message) {
        let now = self.engine.borrow().now();
        self.prune_past(now);
        self.events.borrow_mut().push(MessageEvent {
            time,
            message: message.clone(),
        });
        let destinations = self.destinations.borrow().clone();
        for destination in &destinations {
            destination.schedule_message_callback(time, &message);
        }
    }

    /// Drops log entries at or after `time` (entries strictly before it
    /// are retained) and forwards the cancellation to every destination.
    pub fn cancel_scheduled_messages(&self, time: f64) {
        self.events.borrow_mut().retain(|event| event.time < time);
        let destinations = self.destinations.borrow().clone();
        for destination in &destinations {
            destination.cancel_scheduled_message_callbacks(time);
        }
    }

    /// Number of connected destinations (duplicates counted).
    pub fn destination_count(&self) -> usize {
        self.destinations.borrow().len()
    }

    /// Number of events currently held in the log.
    pub fn logged_events(&self) -> usize {
        self.events.borrow().len()
    }

    fn prune_past(&self, now: f64) {
        self.events.borrow_mut().retain(|event| event.time >= now);
    }
}
