//! Message-to-signal bridge module.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use patchbay_core::{
    EngineHandle, MessageInputNode, Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput,
    NodeId, PatchContext, SignalEngine, options_to_map,
};

/// Options for [`MessageToSignalModule`] — there are none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageToSignalOptions {}

/// Turns discrete numeric messages into a stepped control signal.
///
/// The message arrives on the timer path, but the value change itself is
/// written with the engine's sample-accurate `set_value_at_time` at the
/// message's scheduled time — so a slightly late delivery still lands the
/// step on the grid as long as it beats the deadline.
pub struct MessageToSignalModule {
    id: ModuleId,
    engine: EngineHandle,
    node: NodeId,
    options: MessageToSignalOptions,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl MessageToSignalModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "msg-to-signal";

    /// Creates the bridge around a constant-signal engine node.
    pub fn new(ctx: &PatchContext, id: ModuleId, _options: Option<&ModuleOptions>) -> Self {
        let engine = ctx.engine().clone();
        let (node, offset) = {
            let mut eng = engine.borrow_mut();
            let node = eng.create_node("constant");
            let offset = eng.param(node, "offset");
            eng.set_param(offset, 0.0);
            eng.start_node(node, None, None);
            (node, offset)
        };

        let handler_engine = engine.clone();
        let handler = MessageInputNode::new(Rc::clone(ctx.timers()), move |time, message| {
            match message.coerce_number() {
                Some(value) => {
                    handler_engine
                        .borrow_mut()
                        .set_param_at_time(offset, value, time);
                }
                None => {
                    tracing::warn!("msg-to-signal received non-numeric message: {message:?}");
                }
            }
        });

        Self {
            id,
            engine: engine.clone(),
            node,
            options: MessageToSignalOptions::default(),
            inputs: vec![ModuleInput::message("message-input", handler)],
            outputs: vec![ModuleOutput::signal("signal-output", node, engine)],
        }
    }
}

impl Module for MessageToSignalModule {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn category(&self) -> &'static str {
        Self::CATEGORY
    }

    fn inputs(&self) -> &[ModuleInput] {
        &self.inputs
    }

    fn outputs(&self) -> &[ModuleOutput] {
        &self.outputs
    }

    fn options(&self) -> ModuleOptions {
        options_to_map(&self.options)
    }

    fn update_options(&mut self, _patch: &ModuleOptions) {}

    fn dispose(&mut self) {
        let mut engine = self.engine.borrow_mut();
        engine.stop_node(self.node, None);
        engine.free_node(self.node);
    }
}
