//! The per-session context bundle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bus::TimerQueue;
use crate::engine::{EngineHandle, SignalEngine};
use crate::resource::ResourceManager;

/// Explicit, shareable handles to the collaborators one patch session
/// runs against: the signal engine, the deferred-delivery timer queue,
/// and the resource registry.
///
/// Nothing here is global. Two contexts are two fully independent
/// sessions, which is what makes side-by-side patches (and tests) work.
/// Cloning the context clones the handles, not the state.
#[derive(Clone)]
pub struct PatchContext {
    engine: EngineHandle,
    timers: Rc<RefCell<TimerQueue>>,
    resources: Rc<RefCell<ResourceManager>>,
}

impl PatchContext {
    /// Creates a context around a signal engine.
    pub fn new(engine: impl SignalEngine + 'static) -> Self {
        Self::with_handle(Rc::new(RefCell::new(engine)))
    }

    /// Creates a context around an existing engine handle (useful when a
    /// test keeps a concrete handle for assertions).
    pub fn with_handle(engine: EngineHandle) -> Self {
        Self {
            engine,
            timers: Rc::new(RefCell::new(TimerQueue::new())),
            resources: Rc::new(RefCell::new(ResourceManager::new())),
        }
    }

    /// The signal engine handle.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// The shared timer queue.
    pub fn timers(&self) -> &Rc<RefCell<TimerQueue>> {
        &self.timers
    }

    /// The resource registry.
    pub fn resources(&self) -> &Rc<RefCell<ResourceManager>> {
        &self.resources
    }

    /// Current engine clock, in seconds.
    pub fn now(&self) -> f64 {
        self.engine.borrow().now()
    }

    /// Fires every deferred delivery that is due at the current clock, in
    /// (time, insertion) order, and returns how many fired.
    ///
    /// Entries are popped one at a time and delivered outside the queue
    /// borrow, so a delivery is free to schedule follow-ups; follow-ups
    /// already due fire within the same pump.
    pub fn pump(&self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.engine.borrow().now();
            let entry = self.timers.borrow_mut().pop_due(now);
            match entry {
                Some(entry) => {
                    entry.fire();
                    fired += 1;
                }
                None => break,
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MessageDestination, MessageInputNode};
    use crate::engine::NullEngine;
    use crate::message::Message;

    #[test]
    fn pump_fires_due_entries_in_order() {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let input = MessageInputNode::new(Rc::clone(ctx.timers()), move |time, _| {
            sink.borrow_mut().push(time);
        });
        input.schedule_message_callback(2.0, &Message::Number(2.0));
        input.schedule_message_callback(1.0, &Message::Number(1.0));
        input.schedule_message_callback(9.0, &Message::Number(9.0));

        null.borrow_mut().set_now(2.5);
        assert_eq!(ctx.pump(), 2);
        assert_eq!(*received.borrow(), vec![1.0, 2.0]);
        // The t=9 entry stays queued.
        assert_eq!(input.pending(), 1);
    }

    #[test]
    fn a_delivery_may_schedule_follow_ups() {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);

        let count = Rc::new(RefCell::new(0u32));
        let timers = Rc::clone(ctx.timers());
        let input: Rc<RefCell<Option<Rc<MessageInputNode>>>> = Rc::new(RefCell::new(None));
        let input_ref = Rc::clone(&input);
        let counter = Rc::clone(&count);
        let node = MessageInputNode::new(timers, move |time, message| {
            *counter.borrow_mut() += 1;
            // Chain one follow-up delivery a second later, twice.
            if *counter.borrow() < 3 {
                if let Some(node) = input_ref.borrow().as_ref() {
                    node.schedule_message_callback(time + 1.0, message);
                }
            }
        });
        *input.borrow_mut() = Some(Rc::clone(&node));

        node.schedule_message_callback(1.0, &Message::from("go"));
        null.borrow_mut().set_now(10.0);
        // All three fire in one pump: each follow-up is already due.
        assert_eq!(ctx.pump(), 3);
        assert_eq!(*count.borrow(), 3);
    }
}
