//! Message-bus destinations.
//!
//! Two kinds of endpoint can sit at the receiving end of a message-bus
//! connection, and they deliver on deliberately different paths:
//!
//! - [`MessageInputNode`] hands the payload to a module callback through
//!   the timer queue — best-effort, millisecond-jitter delivery.
//! - [`ParamEndpoint`] forwards numeric payloads straight into the signal
//!   engine's sample-accurate automation.
//!
//! The split is a contract, not an implementation detail: discrete events
//! tolerate jitter, parameter changes do not. Do not unify the two.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::engine::{EngineHandle, ParamId};
use crate::message::Message;

use super::timer::{OwnerId, TimerHandle, TimerSink};

/// The receiving side of a message-bus connection.
pub trait MessageDestination {
    /// Arranges delivery of `message` at `time`.
    fn schedule_message_callback(&self, time: f64, message: &Message);

    /// Cancels this destination's pending deliveries at or after `time`.
    fn cancel_scheduled_message_callbacks(&self, time: f64);
}

/// Callback invoked when a deferred message reaches its module.
pub type MessageCallback = Box<dyn FnMut(f64, &Message)>;

struct HandlerCell {
    callback: RefCell<MessageCallback>,
}

impl TimerSink for HandlerCell {
    fn deliver(&self, time: f64, message: &Message) {
        (self.callback.borrow_mut())(time, message);
    }
}

/// Timer-based message destination owned by a module input port.
///
/// Deliveries are queued against the shared [`TimerQueue`] and invoke the
/// module's callback when the host pumps past their time. Dropping the
/// node cancels whatever it still has pending.
///
/// [`TimerQueue`]: super::timer::TimerQueue
pub struct MessageInputNode {
    owner: OwnerId,
    timers: TimerHandle,
    handler: Rc<HandlerCell>,
}

impl MessageInputNode {
    /// Creates an input node delivering into `callback`.
    pub fn new(timers: TimerHandle, callback: impl FnMut(f64, &Message) + 'static) -> Rc<Self> {
        let owner = timers.borrow_mut().allocate_owner();
        Rc::new(Self {
            owner,
            timers,
            handler: Rc::new(HandlerCell {
                callback: RefCell::new(Box::new(callback)),
            }),
        })
    }

    /// Number of deliveries this node still has pending.
    pub fn pending(&self) -> usize {
        self.timers.borrow().pending_for(self.owner)
    }
}

impl MessageDestination for MessageInputNode {
    fn schedule_message_callback(&self, time: f64, message: &Message) {
        self.timers.borrow_mut().schedule(
            self.owner,
            time,
            message.clone(),
            Rc::downgrade(&self.handler) as Weak<dyn TimerSink>,
        );
    }

    fn cancel_scheduled_message_callbacks(&self, time: f64) {
        self.timers.borrow_mut().cancel_at_or_after(self.owner, time);
    }
}

impl Drop for MessageInputNode {
    fn drop(&mut self) {
        self.timers.borrow_mut().cancel_owner(self.owner);
    }
}

/// Automation-based message destination wrapping an engine parameter.
///
/// A parameter exposed for message-bus control does not go through the
/// timer queue at all: numeric payloads become `set_value_at_time` calls
/// on the engine, and cancellation becomes `cancel_scheduled_values`.
/// Non-numeric payloads are logged and dropped.
pub struct ParamEndpoint {
    engine: EngineHandle,
    param: ParamId,
}

impl ParamEndpoint {
    /// Wraps an engine parameter as a message destination.
    pub fn new(engine: EngineHandle, param: ParamId) -> Rc<Self> {
        Rc::new(Self { engine, param })
    }

    /// The wrapped engine parameter.
    pub fn param(&self) -> ParamId {
        self.param
    }
}

impl MessageDestination for ParamEndpoint {
    fn schedule_message_callback(&self, time: f64, message: &Message) {
        match message.as_number() {
            Some(value) => {
                self.engine
                    .borrow_mut()
                    .set_param_at_time(self.param, value, time);
            }
            None => {
                tracing::warn!("param endpoint received non-numeric message: {message:?}");
            }
        }
    }

    fn cancel_scheduled_message_callbacks(&self, time: f64) {
        self.engine
            .borrow_mut()
            .cancel_scheduled_values(self.param, time);
    }
}
