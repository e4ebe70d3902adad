//! Gain (amplifier) module.

use serde::{Deserialize, Serialize};

use patchbay_core::{
    EngineHandle, Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput, NodeId, ParamId,
    PatchContext, SignalEngine, options_from_map, options_to_map,
};

/// Options for [`GainModule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GainOptions {
    /// Linear gain factor.
    pub gain: f64,
}

impl Default for GainOptions {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

/// A gain stage: signal in, signal out, and the gain parameter exposed
/// for signal-rate modulation.
pub struct GainModule {
    id: ModuleId,
    engine: EngineHandle,
    node: NodeId,
    gain: ParamId,
    options: GainOptions,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl GainModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "gain";

    /// Creates a gain stage.
    pub fn new(ctx: &PatchContext, id: ModuleId, options: Option<&ModuleOptions>) -> Self {
        let options: GainOptions = options_from_map(options);
        let engine = ctx.engine().clone();

        let (node, gain) = {
            let mut eng = engine.borrow_mut();
            let node = eng.create_node("gain");
            let gain = eng.param(node, "gain");
            eng.set_param(gain, options.gain);
            (node, gain)
        };

        let outputs = vec![ModuleOutput::signal(
            "gain-signal-output",
            node,
            engine.clone(),
        )];
        let inputs = vec![
            ModuleInput::signal("gain-signal-input", node),
            ModuleInput::param("gain-param", gain),
        ];

        Self {
            id,
            engine,
            node,
            gain,
            options,
            inputs,
            outputs,
        }
    }
}

impl Module for GainModule {
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

    fn update_options(&mut self, patch: &ModuleOptions) {
        if let Some(gain) = patch.get("gain").and_then(|v| v.as_f64()) {
            self.engine.borrow_mut().set_param(self.gain, gain);
            self.options.gain = gain;
        }
    }

    fn dispose(&mut self) {
        self.engine.borrow_mut().free_node(self.node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::NullEngine;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn exposes_signal_io_and_a_modulation_input() {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);
        let gain = GainModule::new(&ctx, ModuleId::from("gain-1"), None);

        assert_eq!(gain.inputs().len(), 2);
        assert_eq!(gain.outputs().len(), 1);
        assert!(gain.input("gain-signal-input").is_some());
        assert!(gain.input("gain-param").is_some());
        assert_eq!(null.borrow().param_value(gain.gain), Some(1.0));
    }

    #[test]
    fn gain_updates_reach_the_engine() {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);
        let mut gain = GainModule::new(&ctx, ModuleId::from("gain-1"), None);

        let mut patch = ModuleOptions::new();
        patch.insert("gain".to_owned(), serde_json::json!(0.25));
        gain.update_options(&patch);
        assert_eq!(null.borrow().param_value(gain.gain), Some(0.25));
        assert_eq!(gain.options.gain, 0.25);
    }
}
