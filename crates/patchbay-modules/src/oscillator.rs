//! Oscillator source module.

use serde::{Deserialize, Serialize};

use patchbay_core::{
    EngineHandle, Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput, NodeId, ParamId,
    PatchContext, SignalEngine, options_from_map, options_to_map,
};

/// Options for [`OscillatorModule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorOptions {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Waveform name passed to the engine (`"sine"`, `"square"`, ...).
    pub waveform: String,
}

impl Default for OscillatorOptions {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            waveform: "sine".to_owned(),
        }
    }
}

/// A free-running oscillator: one signal output, plus the frequency
/// parameter exposed as a signal-rate modulation input.
pub struct OscillatorModule {
    id: ModuleId,
    engine: EngineHandle,
    node: NodeId,
    frequency: ParamId,
    options: OscillatorOptions,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl OscillatorModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "oscillator";

    /// Creates and starts an oscillator.
    pub fn new(ctx: &PatchContext, id: ModuleId, options: Option<&ModuleOptions>) -> Self {
        let options: OscillatorOptions = options_from_map(options);
        let engine = ctx.engine().clone();

        let (node, frequency) = {
            let mut eng = engine.borrow_mut();
            let node = eng.create_node("oscillator");
            let frequency = eng.param(node, "frequency");
            eng.set_param(frequency, options.frequency);
            eng.set_attribute(node, "type", &options.waveform);
            eng.start_node(node, None, None);
            (node, frequency)
        };

        let outputs = vec![ModuleOutput::signal(
            "osc-signal-output",
            node,
            engine.clone(),
        )];
        let inputs = vec![ModuleInput::param("frequency-param", frequency)];

        Self {
            id,
            engine,
            node,
            frequency,
            options,
            inputs,
            outputs,
        }
    }
}

impl Module for OscillatorModule {
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
        if let Some(frequency) = patch.get("frequency").and_then(|v| v.as_f64()) {
            if frequency != self.options.frequency {
                self.engine
                    .borrow_mut()
                    .set_param(self.frequency, frequency);
                self.options.frequency = frequency;
            }
        }
        if let Some(waveform) = patch.get("waveform").and_then(|v| v.as_str()) {
            if waveform != self.options.waveform {
                self.engine
                    .borrow_mut()
                    .set_attribute(self.node, "type", waveform);
                self.options.waveform = waveform.to_owned();
            }
        }
    }

    fn dispose(&mut self) {
        let mut engine = self.engine.borrow_mut();
        engine.stop_node(self.node, None);
        engine.free_node(self.node);
    }
}
