//! Clock module: emits `"tick"` messages at a bpm interval.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use patchbay_core::{
    Message, MessageOutputNode, Module, ModuleId, ModuleInput, ModuleOptions, ModuleOutput,
    OwnerId, PatchContext, TimerHandle, TimerSink, options_from_map, options_to_map,
};

/// Options for [`ClockModule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockOptions {
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Whether the clock is emitting.
    pub running: bool,
}

impl Default for ClockOptions {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            running: true,
        }
    }
}

/// Self-rearming tick source. Each delivery emits a tick (when running)
/// and schedules the next one through the timer queue.
struct ClockTicker {
    timers: TimerHandle,
    owner: OwnerId,
    output: Rc<MessageOutputNode>,
    interval: Cell<f64>,
    running: Cell<bool>,
    weak: Weak<ClockTicker>,
}

impl ClockTicker {
    fn arm(self: &Rc<Self>, due: f64) {
        self.timers.borrow_mut().schedule(
            self.owner,
            due,
            Message::from("tick"),
            Rc::downgrade(self) as Weak<dyn TimerSink>,
        );
    }
}

impl TimerSink for ClockTicker {
    fn deliver(&self, time: f64, _message: &Message) {
        if self.running.get() {
            self.output.schedule_message(time, Message::from("tick"));
        }
        if let Some(ticker) = self.weak.upgrade() {
            ticker.arm(time + self.interval.get());
        }
    }
}

/// A steady clock with one message output.
///
/// Ticks are scheduled on the shared timer queue; the emitted messages go
/// out through the usual message-bus transport, so destinations that
/// patch in mid-performance pick up the pending tick via
/// replay-on-connect like any other event.
pub struct ClockModule {
    id: ModuleId,
    ticker: Rc<ClockTicker>,
    timers: TimerHandle,
    options: ClockOptions,
    inputs: Vec<ModuleInput>,
    outputs: Vec<ModuleOutput>,
}

impl ClockModule {
    /// Factory key for this module.
    pub const CATEGORY: &'static str = "clock";

    /// Creates the clock and arms its first tick one interval from now.
    pub fn new(ctx: &PatchContext, id: ModuleId, options: Option<&ModuleOptions>) -> Self {
        let options: ClockOptions = options_from_map(options);
        let timers = Rc::clone(ctx.timers());
        let output = MessageOutputNode::new(ctx.engine().clone());

        let owner = timers.borrow_mut().allocate_owner();
        let ticker = Rc::new_cyclic(|weak| ClockTicker {
            timers: Rc::clone(&timers),
            owner,
            output: Rc::clone(&output),
            interval: Cell::new(interval_seconds(options.bpm)),
            running: Cell::new(options.running),
            weak: weak.clone(),
        });
        ticker.arm(ctx.now() + ticker.interval.get());

        let outputs = vec![ModuleOutput::message("clock-output", output)];

        Self {
            id,
            ticker,
            timers,
            options,
            inputs: Vec::new(),
            outputs,
        }
    }

    /// Resumes tick emission.
    pub fn start(&mut self) {
        self.ticker.running.set(true);
        self.options.running = true;
    }

    /// Pauses tick emission. The re-arm chain keeps running so `start`
    /// resumes on the grid.
    pub fn stop(&mut self) {
        self.ticker.running.set(false);
        self.options.running = false;
    }
}

fn interval_seconds(bpm: f64) -> f64 {
    60.0 / bpm
}

impl Module for ClockModule {
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
        if let Some(bpm) = patch.get("bpm").and_then(|v| v.as_f64()) {
            if bpm > 0.0 {
                self.options.bpm = bpm;
                self.ticker.interval.set(interval_seconds(bpm));
            } else {
                tracing::warn!("clock ignoring non-positive bpm: {bpm}");
            }
        }
        if let Some(running) = patch.get("running").and_then(|v| v.as_bool()) {
            self.options.running = running;
            self.ticker.running.set(running);
        }
    }

    fn dispose(&mut self) {
        self.ticker.running.set(false);
        self.timers.borrow_mut().cancel_owner(self.ticker.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::{EngineHandle, MessageInputNode, NullEngine};
    use std::cell::RefCell;

    struct Rig {
        null: Rc<RefCell<NullEngine>>,
        ctx: PatchContext,
    }

    fn rig() -> Rig {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let ctx = PatchContext::with_handle(Rc::clone(&null) as EngineHandle);
        Rig { null, ctx }
    }

    fn tick_counter(rig: &Rig) -> (Rc<MessageInputNode>, Rc<RefCell<Vec<f64>>>) {
        let times = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&times);
        let input = MessageInputNode::new(Rc::clone(rig.ctx.timers()), move |time, _| {
            sink.borrow_mut().push(time);
        });
        (input, times)
    }

    fn connect(clock: &ClockModule, input: &Rc<MessageInputNode>) {
        clock
            .output("clock-output")
            .unwrap()
            .connect(&ModuleInput::message("in", Rc::clone(input)))
            .unwrap();
    }

    #[test]
    fn ticks_on_the_bpm_grid() {
        let rig = rig();
        let mut map = ModuleOptions::new();
        map.insert("bpm".to_owned(), serde_json::json!(60.0));
        let clock = ClockModule::new(&rig.ctx, ModuleId::from("clk"), Some(&map));

        let (input, times) = tick_counter(&rig);
        connect(&clock, &input);

        rig.null.borrow_mut().set_now(3.5);
        rig.ctx.pump();
        // Ticks at t=1, 2, 3; each fan-out delivery is itself due.
        assert_eq!(*times.borrow(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn stopped_clock_keeps_the_grid_but_emits_nothing() {
        let rig = rig();
        let mut clock = ClockModule::new(&rig.ctx, ModuleId::from("clk"), None);
        let (input, times) = tick_counter(&rig);
        connect(&clock, &input);

        clock.stop();
        rig.null.borrow_mut().set_now(2.0);
        rig.ctx.pump();
        assert!(times.borrow().is_empty());

        clock.start();
        rig.null.borrow_mut().set_now(4.0);
        rig.ctx.pump();
        assert!(!times.borrow().is_empty());
    }

    #[test]
    fn dispose_stops_the_rearm_chain() {
        let rig = rig();
        let mut clock = ClockModule::new(&rig.ctx, ModuleId::from("clk"), None);
        clock.dispose();
        rig.null.borrow_mut().set_now(60.0);
        assert_eq!(rig.ctx.pump(), 0);
    }

    #[test]
    fn late_joiner_misses_past_ticks_but_gets_the_next_one() {
        let rig = rig();
        let clock = ClockModule::new(&rig.ctx, ModuleId::from("clk"), None);

        // Let one tick fire with nobody listening (interval 0.5s @ 120bpm).
        rig.null.borrow_mut().set_now(0.6);
        rig.ctx.pump();

        let (input, times) = tick_counter(&rig);
        connect(&clock, &input);
        // The t=0.5 tick is strictly in the past: not replayed.
        assert_eq!(input.pending(), 0);

        rig.null.borrow_mut().set_now(1.0);
        rig.ctx.pump();
        assert_eq!(*times.borrow(), vec![1.0]);
    }
}
