//! Sample player module.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use patchbay_core::{
    EngineHandle, MessageInputNode, Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput,
    NodeId, ParamId, PatchContext, ResourceHandle, ResourceManager, SignalEngine,
    options_from_map, options_to_map,
};

/// Options for [`PlayerModule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    /// Name of the sample resource in the session's resource registry.
    /// Empty means no sample loaded.
    pub sample: String,
    /// Playback start offset in seconds.
    pub start_position: f64,
    /// Fade-in time in seconds.
    pub fade_in: f64,
    /// Fade-out time in seconds.
    pub fade_out: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            sample: String::new(),
            start_position: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }
}

/// Plays a named sample resource on message triggers.
///
/// The module holds one reference to its sample for as long as it uses
/// it: requested on adoption, released on swap and on dispose. Triggers
/// arrive on the `trigger-sample` message input; `start-position`
/// messages move the playback offset for subsequent triggers.
pub struct PlayerModule {
    id: ModuleId,
    engine: EngineHandle,
    resources: Rc<RefCell<ResourceManager>>,
    node: NodeId,
    fade_in: ParamId,
    fade_out: ParamId,
    options: PlayerOptions,
    start_position: Rc<Cell<f64>>,
    loaded: Rc<Cell<bool>>,
    handle: Option<ResourceHandle>,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl PlayerModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "player";

    /// Creates a player, requesting its sample resource if one is named.
    pub fn new(ctx: &PatchContext, id: ModuleId, options: Option<&ModuleOptions>) -> Self {
        let options: PlayerOptions = options_from_map(options);
        let engine = ctx.engine().clone();
        let resources = Rc::clone(ctx.resources());

        let (node, fade_in, fade_out) = {
            let mut eng = engine.borrow_mut();
            let node = eng.create_node("player");
            let fade_in = eng.param(node, "fadeIn");
            let fade_out = eng.param(node, "fadeOut");
            eng.set_param(fade_in, options.fade_in);
            eng.set_param(fade_out, options.fade_out);
            (node, fade_in, fade_out)
        };

        let start_position = Rc::new(Cell::new(options.start_position.max(0.0)));
        let loaded = Rc::new(Cell::new(false));

        let trigger_engine = engine.clone();
        let trigger_loaded = Rc::clone(&loaded);
        let trigger_position = Rc::clone(&start_position);
        let trigger = MessageInputNode::new(Rc::clone(ctx.timers()), move |time, _message| {
            if trigger_loaded.get() {
                trigger_engine.borrow_mut().start_node(
                    node,
                    Some(time),
                    Some(trigger_position.get()),
                );
            }
        });

        let position_cell = Rc::clone(&start_position);
        let position = MessageInputNode::new(Rc::clone(ctx.timers()), move |_time, message| {
            match message.coerce_number() {
                Some(value) => position_cell.set(value.max(0.0)),
                None => tracing::warn!("player start-position expects a number, got {message:?}"),
            }
        });

        let mut player = Self {
            id,
            engine: engine.clone(),
            resources,
            node,
            fade_in,
            fade_out,
            options,
            start_position,
            loaded,
            handle: None,
            inputs: vec![
                ModuleInput::message("trigger-sample", trigger),
                ModuleInput::message("start-position", position),
            ],
            outputs: vec![ModuleOutput::signal("output", node, engine)],
        };

        if !player.options.sample.is_empty() {
            let name = player.options.sample.clone();
            player.adopt_sample(&name);
        }
        player
    }

    /// Requests `name` from the registry and loads it into the engine
    /// node, releasing any previously held sample on success.
    fn adopt_sample(&mut self, name: &str) {
        let Some(handle) = self.resources.borrow_mut().request_resource(name) else {
            // Warned by the registry; keep whatever we had.
            return;
        };
        let Some(data) = handle.data() else {
            tracing::warn!("player sample \"{name}\" was revoked before loading");
            self.resources.borrow_mut().release_resource(name);
            return;
        };

        if let Some(old) = self.handle.take() {
            self.resources.borrow_mut().release_resource(old.name());
        }
        self.engine.borrow_mut().load_buffer(self.node, &data);
        self.loaded.set(true);
        self.options.sample = name.to_owned();
        self.handle = Some(handle);
    }
}

impl Module for PlayerModule {
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
        let mut map = options_to_map(&self.options);
        // The live offset may have been moved by start-position messages.
        map.insert(
            "start_position".to_owned(),
            serde_json::json!(self.start_position.get()),
        );
        map
    }

    fn update_options(&mut self, patch: &ModuleOptions) {
        if let Some(sample) = patch.get("sample").and_then(|v| v.as_str()) {
            if !sample.is_empty() && sample != self.options.sample {
                self.adopt_sample(sample);
            }
        }
        if let Some(fade_in) = patch.get("fade_in").and_then(|v| v.as_f64()) {
            self.engine.borrow_mut().set_param(self.fade_in, fade_in);
            self.options.fade_in = fade_in;
        }
        if let Some(fade_out) = patch.get("fade_out").and_then(|v| v.as_f64()) {
            self.engine.borrow_mut().set_param(self.fade_out, fade_out);
            self.options.fade_out = fade_out;
        }
        if let Some(position) = patch.get("start_position").and_then(|v| v.as_f64()) {
            self.start_position.set(position.max(0.0));
            self.options.start_position = position.max(0.0);
        }
    }

    fn dispose(&mut self) {
        {
            let mut engine = self.engine.borrow_mut();
            engine.stop_node(self.node, None);
            engine.free_node(self.node);
        }
        if let Some(handle) = self.handle.take() {
            self.resources.borrow_mut().release_resource(handle.name());
        }
        self.loaded.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::{Message, MessageDestination, NullEngine};

    struct Rig {
        null: Rc<RefCell<NullEngine>>,
        ctx: PatchContext,
    }

    fn rig_with_sample() -> Rig {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);
        ctx.resources()
            .borrow_mut()
            .register_resource("kick.wav", vec![0u8; 64])
            .unwrap();
        Rig { null, ctx }
    }

    fn player_options(sample: &str) -> ModuleOptions {
        let mut map = ModuleOptions::new();
        map.insert("sample".to_owned(), serde_json::json!(sample));
        map
    }

    fn trigger(player: &PlayerModule, time: f64) {
        let patchbay_core::InputKind::MessageHandler(handler) =
            player.input("trigger-sample").unwrap().kind()
        else {
            panic!("expected a message handler input");
        };
        handler.schedule_message_callback(time, &Message::from("bang"));
    }

    #[test]
    fn requests_loads_and_releases_its_sample() {
        let rig = rig_with_sample();
        let opts = player_options("kick.wav");
        let mut player = PlayerModule::new(&rig.ctx, ModuleId::from("p1"), Some(&opts));

        assert_eq!(
            rig.ctx.resources().borrow().ref_count("kick.wav"),
            Some(2)
        );
        assert_eq!(rig.null.borrow().buffer_len(player.node), Some(64));

        player.dispose();
        assert_eq!(
            rig.ctx.resources().borrow().ref_count("kick.wav"),
            Some(1)
        );
    }

    #[test]
    fn trigger_starts_playback_at_the_stored_offset() {
        let rig = rig_with_sample();
        let opts = player_options("kick.wav");
        let player = PlayerModule::new(&rig.ctx, ModuleId::from("p1"), Some(&opts));

        // Move the offset via the start-position input, then trigger.
        let patchbay_core::InputKind::MessageHandler(position) =
            player.input("start-position").unwrap().kind()
        else {
            panic!("expected a message handler input");
        };
        position.schedule_message_callback(0.5, &Message::Number(1.25));
        trigger(&player, 1.0);

        rig.null.borrow_mut().set_now(2.0);
        rig.ctx.pump();

        assert_eq!(rig.null.borrow().started(), &[(player.node, 1.0, 1.25)]);
    }

    #[test]
    fn unloaded_player_ignores_triggers() {
        let rig = rig_with_sample();
        let player = PlayerModule::new(&rig.ctx, ModuleId::from("p1"), None);
        trigger(&player, 1.0);
        rig.null.borrow_mut().set_now(2.0);
        rig.ctx.pump();
        assert!(rig.null.borrow().started().is_empty());
    }

    #[test]
    fn swapping_samples_releases_the_old_reference() {
        let rig = rig_with_sample();
        rig.ctx
            .resources()
            .borrow_mut()
            .register_resource("snare.wav", vec![1u8; 32])
            .unwrap();

        let opts = player_options("kick.wav");
        let mut player = PlayerModule::new(&rig.ctx, ModuleId::from("p1"), Some(&opts));
        player.update_options(&player_options("snare.wav"));

        let resources = rig.ctx.resources();
        assert_eq!(resources.borrow().ref_count("kick.wav"), Some(1));
        assert_eq!(resources.borrow().ref_count("snare.wav"), Some(2));
        assert_eq!(rig.null.borrow().buffer_len(player.node), Some(32));
    }

    #[test]
    fn missing_sample_is_non_fatal() {
        let rig = rig_with_sample();
        let opts = player_options("ghost.wav");
        let player = PlayerModule::new(&rig.ctx, ModuleId::from("p1"), Some(&opts));
        assert!(player.handle.is_none());
        assert!(!player.loaded.get());
    }
}
