//! Logger module: prints every message it receives.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use patchbay_core::{
    MessageInputNode, Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput, PatchContext,
    options_to_map,
};

/// Options for [`LoggerModule`] — there are none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerOptions {}

/// A message sink that logs each payload with its delivery time.
pub struct LoggerModule {
    id: ModuleId,
    options: LoggerOptions,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl LoggerModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "logger";

    /// Creates a logger.
    pub fn new(ctx: &PatchContext, id: ModuleId, _options: Option<&ModuleOptions>) -> Self {
        let log_id = id.clone();
        let handler = MessageInputNode::new(Rc::clone(ctx.timers()), move |time, message| {
            tracing::info!("logger {log_id} received {message:?} at {time}");
        });

        Self {
            id,
            options: LoggerOptions::default(),
            inputs: vec![ModuleInput::message("message-input", handler)],
            outputs: Vec::new(),
        }
    }
}

impl Module for LoggerModule {
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

    fn dispose(&mut self) {}
}
