//! Terminal speaker output module.

use serde::{Deserialize, Serialize};

use patchbay_core::{
    Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput, PatchContext, SignalEngine,
    options_to_map,
};

/// Options for [`SpeakerOutputModule`] — there are none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerOutputOptions {}

/// Wraps the engine's terminal destination node as a signal input.
///
/// The destination node is owned by the engine and shared by every
/// speaker-output module in the session, so `dispose` never frees it.
pub struct SpeakerOutputModule {
    id: ModuleId,
    options: SpeakerOutputOptions,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl SpeakerOutputModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "speaker-output";

    /// Creates a speaker output.
    pub fn new(ctx: &PatchContext, id: ModuleId, _options: Option<&ModuleOptions>) -> Self {
        let destination = ctx.engine().borrow().destination();
        Self {
            id,
            options: SpeakerOutputOptions::default(),
            inputs: vec![ModuleInput::signal("input", destination)],
            outputs: Vec::new(),
        }
    }
}

impl Module for SpeakerOutputModule {
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

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::{EngineHandle, NullEngine};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn wraps_the_engine_destination() {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);
        let speaker = SpeakerOutputModule::new(&ctx, ModuleId::from("out-1"), None);

        assert_eq!(speaker.inputs().len(), 1);
        assert!(speaker.outputs().is_empty());
        assert!(speaker.input("input").is_some());
    }

    #[test]
    fn dispose_leaves_the_destination_alive() {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);
        let dest = null.borrow().destination();
        let mut speaker = SpeakerOutputModule::new(&ctx, ModuleId::from("out-1"), None);
        speaker.dispose();
        assert!(null.borrow().has_node(dest));
    }
}
