//! Module ports and connection-type resolution.
//!
//! A port is a named attachment point on a module. Its connection
//! category — continuous signal vs. discrete message bus — is a tag fixed
//! at construction and carried alongside the wrapped primitive, so
//! compatibility between two ports is a single comparison and adding a
//! new primitive kind never touches resolution logic. The two categories
//! are incompatible: pairing them is rejected with
//! [`PatchError::TypeMismatch`] before any wiring happens.

use std::rc::Rc;

use crate::bus::{MessageDestination, MessageInputNode, MessageOutputNode, ParamEndpoint};
use crate::engine::{EngineHandle, NodeId, ParamId};
use crate::error::PatchError;

/// The two wiring categories. Signal links are rendered by the external
/// engine at audio rate; message-bus links carry timestamped discrete
/// events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionType {
    /// Continuous audio-rate link between engine nodes.
    Signal,
    /// Discrete timestamped event link.
    MessageBus,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Signal => write!(f, "signal"),
            ConnectionType::MessageBus => write!(f, "message-bus"),
        }
    }
}

/// What an output port wraps.
pub enum OutputKind {
    /// An engine node producing a continuous signal.
    Signal {
        /// The wrapped engine node.
        node: NodeId,
        /// Engine used to perform the wiring.
        engine: EngineHandle,
    },
    /// A message-bus source.
    Message(Rc<MessageOutputNode>),
}

impl OutputKind {
    /// The connection category of this kind.
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            OutputKind::Signal { .. } => ConnectionType::Signal,
            OutputKind::Message(_) => ConnectionType::MessageBus,
        }
    }
}

/// What an input port wraps.
pub enum InputKind {
    /// An engine node consuming a continuous signal.
    Signal(NodeId),
    /// An engine parameter accepting signal-rate modulation.
    Param(ParamId),
    /// A timer-based message callback endpoint.
    MessageHandler(Rc<MessageInputNode>),
    /// An engine parameter exposed for message-bus control through
    /// sample-accurate automation.
    MessageParam(Rc<ParamEndpoint>),
}

impl InputKind {
    /// The connection category of this kind.
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            InputKind::Signal(_) | InputKind::Param(_) => ConnectionType::Signal,
            InputKind::MessageHandler(_) | InputKind::MessageParam(_) => {
                ConnectionType::MessageBus
            }
        }
    }
}

/// A named input port on a module.
///
/// Ports do not own connections — the patcher tracks logical edges, the
/// engine tracks signal wiring, and message outputs track their
/// destination lists.
pub struct ModuleInput {
    name: String,
    kind: InputKind,
}

impl ModuleInput {
    /// An input wrapping an engine node.
    pub fn signal(name: impl Into<String>, node: NodeId) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Signal(node),
        }
    }

    /// An input wrapping an engine parameter (signal-rate modulation).
    pub fn param(name: impl Into<String>, param: ParamId) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Param(param),
        }
    }

    /// An input wrapping a timer-based message callback.
    pub fn message(name: impl Into<String>, handler: Rc<MessageInputNode>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::MessageHandler(handler),
        }
    }

    /// An input wrapping a parameter exposed for message-bus control.
    pub fn message_param(name: impl Into<String>, endpoint: Rc<ParamEndpoint>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::MessageParam(endpoint),
        }
    }

    /// The port name, unique within its module's input list.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped primitive.
    pub fn kind(&self) -> &InputKind {
        &self.kind
    }

    /// The port's connection category.
    pub fn connection_type(&self) -> ConnectionType {
        self.kind.connection_type()
    }
}

/// A named output port on a module.
pub struct ModuleOutput {
    name: String,
    kind: OutputKind,
}

impl ModuleOutput {
    /// An output wrapping an engine node.
    pub fn signal(name: impl Into<String>, node: NodeId, engine: EngineHandle) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::Signal { node, engine },
        }
    }

    /// An output wrapping a message-bus source.
    pub fn message(name: impl Into<String>, node: Rc<MessageOutputNode>) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::Message(node),
        }
    }

    /// The port name, unique within its module's output list.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped primitive.
    pub fn kind(&self) -> &OutputKind {
        &self.kind
    }

    /// The port's connection category.
    pub fn connection_type(&self) -> ConnectionType {
        self.kind.connection_type()
    }

    /// Wires this output to `destination`.
    ///
    /// Signal pairs go through the engine's connect primitive; message
    /// pairs register the destination with this output's transport. A
    /// cross-category pair is rejected with
    /// [`PatchError::TypeMismatch`] and nothing is wired.
    pub fn connect(&self, destination: &ModuleInput) -> Result<(), PatchError> {
        match (&self.kind, &destination.kind) {
            (OutputKind::Signal { node, engine }, InputKind::Signal(to)) => {
                engine.borrow_mut().connect(*node, *to);
                Ok(())
            }
            (OutputKind::Signal { node, engine }, InputKind::Param(param)) => {
                engine.borrow_mut().connect_to_param(*node, *param);
                Ok(())
            }
            (OutputKind::Message(out), InputKind::MessageHandler(handler)) => {
                out.connect(Rc::clone(handler) as Rc<dyn MessageDestination>);
                Ok(())
            }
            (OutputKind::Message(out), InputKind::MessageParam(endpoint)) => {
                out.connect(Rc::clone(endpoint) as Rc<dyn MessageDestination>);
                Ok(())
            }
            _ => Err(self.mismatch(destination)),
        }
    }

    /// Undoes the wiring to `destination`, or every wiring at this port
    /// when `destination` is `None`.
    pub fn disconnect(&self, destination: Option<&ModuleInput>) -> Result<(), PatchError> {
        let Some(destination) = destination else {
            match &self.kind {
                OutputKind::Signal { node, engine } => engine.borrow_mut().disconnect_all(*node),
                OutputKind::Message(out) => out.disconnect_all(),
            }
            return Ok(());
        };

        match (&self.kind, &destination.kind) {
            (OutputKind::Signal { node, engine }, InputKind::Signal(to)) => {
                engine.borrow_mut().disconnect(*node, *to);
                Ok(())
            }
            (OutputKind::Signal { node, engine }, InputKind::Param(param)) => {
                engine.borrow_mut().disconnect_from_param(*node, *param);
                Ok(())
            }
            (OutputKind::Message(out), InputKind::MessageHandler(handler)) => {
                out.disconnect(&(Rc::clone(handler) as Rc<dyn MessageDestination>));
                Ok(())
            }
            (OutputKind::Message(out), InputKind::MessageParam(endpoint)) => {
                out.disconnect(&(Rc::clone(endpoint) as Rc<dyn MessageDestination>));
                Ok(())
            }
            _ => Err(self.mismatch(destination)),
        }
    }

    fn mismatch(&self, destination: &ModuleInput) -> PatchError {
        PatchError::TypeMismatch {
            output: self.name.clone(),
            input: destination.name.clone(),
            output_type: self.connection_type(),
            input_type: destination.connection_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{TimerHandle, TimerQueue};
    use crate::engine::{NullEngine, SignalEngine};
    use std::cell::RefCell;

    fn engine_pair() -> (Rc<RefCell<NullEngine>>, EngineHandle) {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let engine = Rc::clone(&null) as EngineHandle;
        (null, engine)
    }

    fn timers() -> TimerHandle {
        Rc::new(RefCell::new(TimerQueue::new()))
    }

    #[test]
    fn signal_to_signal_wires_the_engine() {
        let (null, engine) = engine_pair();
        let (a, b) = {
            let mut eng = null.borrow_mut();
            (eng.create_node("oscillator"), eng.create_node("gain"))
        };
        let output = ModuleOutput::signal("out", a, Rc::clone(&engine));
        let input = ModuleInput::signal("in", b);

        output.connect(&input).unwrap();
        assert!(null.borrow().is_connected(a, b));

        output.disconnect(Some(&input)).unwrap();
        assert!(!null.borrow().is_connected(a, b));
    }

    #[test]
    fn signal_to_param_wires_signal_rate_modulation() {
        let (null, engine) = engine_pair();
        let (lfo, freq) = {
            let mut eng = null.borrow_mut();
            let lfo = eng.create_node("oscillator");
            let osc = eng.create_node("oscillator");
            let freq = eng.param(osc, "frequency");
            (lfo, freq)
        };
        let output = ModuleOutput::signal("lfo-out", lfo, Rc::clone(&engine));
        let input = ModuleInput::param("frequency-param", freq);

        assert_eq!(input.connection_type(), ConnectionType::Signal);
        output.connect(&input).unwrap();
        assert!(null.borrow().is_connected_to_param(lfo, freq));
    }

    #[test]
    fn cross_category_pairing_is_rejected_without_wiring() {
        let (null, engine) = engine_pair();
        let node = null.borrow_mut().create_node("oscillator");
        let output = ModuleOutput::signal("out", node, Rc::clone(&engine));
        let handler = MessageInputNode::new(timers(), |_, _| {});
        let input = ModuleInput::message("message-input", handler);

        let err = output.connect(&input).unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch { .. }));
        assert_eq!(null.borrow().connection_count(), 0);

        let msg_out = MessageOutputNode::new(Rc::clone(&engine));
        let output = ModuleOutput::message("msg-out", Rc::clone(&msg_out));
        let input = ModuleInput::signal("in", node);
        assert!(output.connect(&input).is_err());
        assert_eq!(msg_out.destination_count(), 0);
    }

    #[test]
    fn message_to_message_registers_with_the_transport() {
        let (_null, engine) = engine_pair();
        let msg_out = MessageOutputNode::new(Rc::clone(&engine));
        let output = ModuleOutput::message("msg-out", Rc::clone(&msg_out));
        let handler = MessageInputNode::new(timers(), |_, _| {});
        let input = ModuleInput::message("message-input", Rc::clone(&handler));

        output.connect(&input).unwrap();
        assert_eq!(msg_out.destination_count(), 1);

        output.disconnect(Some(&input)).unwrap();
        assert_eq!(msg_out.destination_count(), 0);
    }

    #[test]
    fn disconnect_all_tears_down_every_wiring() {
        let (null, engine) = engine_pair();
        let (a, b, c) = {
            let mut eng = null.borrow_mut();
            (
                eng.create_node("gain"),
                eng.create_node("gain"),
                eng.create_node("gain"),
            )
        };
        let output = ModuleOutput::signal("out", a, Rc::clone(&engine));
        output.connect(&ModuleInput::signal("in1", b)).unwrap();
        output.connect(&ModuleInput::signal("in2", c)).unwrap();
        assert_eq!(null.borrow().connection_count(), 2);

        output.disconnect(None).unwrap();
        assert_eq!(null.borrow().connection_count(), 0);
    }
}
