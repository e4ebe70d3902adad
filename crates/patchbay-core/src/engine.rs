//! The external signal engine seam.
//!
//! This core never renders audio itself. Signal connections, node lifetimes,
//! and sample-accurate parameter automation are all delegated to an external
//! engine through the [`SignalEngine`] trait — the engine is assumed to run
//! its own real-time rendering thread and this core only wires references
//! into it.
//!
//! [`NullEngine`] is a headless implementation that records every call. It
//! backs the test suites and is usable for offline sessions where no audio
//! backend exists.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Unique identifier for a primitive node inside the signal engine.
///
/// Node ids are minted by the engine and remain stable for the node's
/// lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Builds a node id from a raw engine value.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Unique identifier for an automatable parameter inside the signal engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamId(u64);

impl ParamId {
    /// Builds a param id from a raw engine value.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParamId({})", self.0)
    }
}

/// Shared handle to a signal engine.
///
/// Execution is single-threaded and cooperative; the handle is an
/// `Rc<RefCell<_>>`, not a lock.
pub type EngineHandle = Rc<RefCell<dyn SignalEngine>>;

/// The capabilities this core consumes from the external signal engine.
///
/// The surface mirrors what a Web-Audio-class engine provides: node
/// creation and start/stop, node-to-node and node-to-param wiring, and
/// set-value-at-time / cancel-scheduled-values parameter automation.
/// Everything behind these calls (rendering, threading, resampling) is the
/// engine's business.
pub trait SignalEngine {
    /// Current value of the engine's reference clock, in seconds.
    fn now(&self) -> f64;

    /// The terminal output node (speakers / main mix).
    fn destination(&self) -> NodeId;

    /// Creates a primitive node of the given kind (`"oscillator"`,
    /// `"gain"`, `"player"`, ...).
    fn create_node(&mut self, kind: &str) -> NodeId;

    /// Releases a node and everything still wired to it.
    fn free_node(&mut self, node: NodeId);

    /// Starts a source node, optionally at a future time and with a
    /// playback offset in seconds.
    fn start_node(&mut self, node: NodeId, time: Option<f64>, offset: Option<f64>);

    /// Stops a source node, optionally at a future time.
    fn stop_node(&mut self, node: NodeId, time: Option<f64>);

    /// Wires one node's output into another node's input.
    fn connect(&mut self, from: NodeId, to: NodeId);

    /// Removes the wiring from `from` to `to` (all of it, if the pair was
    /// connected more than once).
    fn disconnect(&mut self, from: NodeId, to: NodeId);

    /// Wires a node's output into an automatable parameter (signal-rate
    /// modulation).
    fn connect_to_param(&mut self, from: NodeId, to: ParamId);

    /// Removes the wiring from `from` to the parameter `to`.
    fn disconnect_from_param(&mut self, from: NodeId, to: ParamId);

    /// Tears down every outgoing wiring of the node.
    fn disconnect_all(&mut self, from: NodeId);

    /// Resolves a named parameter on a node. Repeated calls with the same
    /// arguments return the same id.
    fn param(&mut self, node: NodeId, name: &str) -> ParamId;

    /// Sets a parameter immediately.
    fn set_param(&mut self, param: ParamId, value: f64);

    /// Schedules a sample-accurate parameter change at `time`.
    fn set_param_at_time(&mut self, param: ParamId, value: f64, time: f64);

    /// Cancels scheduled parameter changes at or after `time`.
    fn cancel_scheduled_values(&mut self, param: ParamId, time: f64);

    /// Sets a discrete, non-automatable node setting (e.g. an oscillator
    /// waveform name).
    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str);

    /// Hands sample data to a node that plays buffers.
    fn load_buffer(&mut self, node: NodeId, data: &[u8]);
}

/// One recorded automation call on a [`NullEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    /// `set_param_at_time` was called.
    SetValueAtTime {
        /// Target parameter.
        param: ParamId,
        /// Scheduled value.
        value: f64,
        /// Scheduled time in seconds.
        time: f64,
    },
    /// `cancel_scheduled_values` was called.
    CancelScheduledValues {
        /// Target parameter.
        param: ParamId,
        /// Cancellation cutoff in seconds.
        time: f64,
    },
}

/// A signal engine that renders nothing and records everything.
///
/// The clock is advanced manually with [`set_now`](Self::set_now) /
/// [`advance`](Self::advance), which makes replay and cancellation
/// behavior fully deterministic under test.
pub struct NullEngine {
    now: f64,
    next_id: u64,
    destination: NodeId,
    nodes: Vec<(NodeId, String)>,
    params: Vec<(ParamId, NodeId, String)>,
    param_values: HashMap<ParamId, f64>,
    connections: Vec<(NodeId, NodeId)>,
    param_connections: Vec<(NodeId, ParamId)>,
    automation: Vec<AutomationEvent>,
    started: Vec<(NodeId, f64, f64)>,
    stopped: Vec<(NodeId, f64)>,
    attributes: Vec<(NodeId, String, String)>,
    buffers: Vec<(NodeId, usize)>,
}

impl NullEngine {
    /// Creates an engine with the clock at zero and a fresh destination
    /// node.
    pub fn new() -> Self {
        let destination = NodeId(0);
        Self {
            now: 0.0,
            next_id: 1,
            destination,
            nodes: vec![(destination, "destination".to_owned())],
            params: Vec::new(),
            param_values: HashMap::new(),
            connections: Vec::new(),
            param_connections: Vec::new(),
            automation: Vec::new(),
            started: Vec::new(),
            stopped: Vec::new(),
            attributes: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Sets the reference clock.
    pub fn set_now(&mut self, now: f64) {
        self.now = now;
    }

    /// Advances the reference clock by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.now += dt;
    }

    /// Number of live node-to-node connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether a node-to-node connection currently exists.
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.connections.iter().any(|&(a, b)| a == from && b == to)
    }

    /// Whether a node-to-param connection currently exists.
    pub fn is_connected_to_param(&self, from: NodeId, to: ParamId) -> bool {
        self.param_connections
            .iter()
            .any(|&(a, b)| a == from && b == to)
    }

    /// Number of live nodes, the destination included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the node has been created and not yet freed.
    pub fn has_node(&self, node: NodeId) -> bool {
        self.nodes.iter().any(|(id, _)| *id == node)
    }

    /// Immediate value last set on a parameter, if any.
    pub fn param_value(&self, param: ParamId) -> Option<f64> {
        self.param_values.get(&param).copied()
    }

    /// Every automation call in order.
    pub fn automation(&self) -> &[AutomationEvent] {
        &self.automation
    }

    /// Every `start_node` call as `(node, time, offset)`.
    pub fn started(&self) -> &[(NodeId, f64, f64)] {
        &self.started
    }

    /// Every `stop_node` call as `(node, time)`.
    pub fn stopped(&self) -> &[(NodeId, f64)] {
        &self.stopped
    }

    /// Last value written for a node attribute.
    pub fn attribute(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|(n, k, _)| *n == node && k == key)
            .map(|(_, _, v)| v.as_str())
    }

    /// Byte length of the buffer last loaded into a node.
    pub fn buffer_len(&self, node: NodeId) -> Option<usize> {
        self.buffers
            .iter()
            .rev()
            .find(|(n, _)| *n == node)
            .map(|(_, len)| *len)
    }

    fn mint(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalEngine for NullEngine {
    fn now(&self) -> f64 {
        self.now
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_node(&mut self, kind: &str) -> NodeId {
        let node = NodeId(self.mint());
        self.nodes.push((node, kind.to_owned()));
        node
    }

    fn free_node(&mut self, node: NodeId) {
        self.nodes.retain(|(id, _)| *id != node);
        self.connections.retain(|&(a, b)| a != node && b != node);
        self.param_connections.retain(|&(a, _)| a != node);
    }

    fn start_node(&mut self, node: NodeId, time: Option<f64>, offset: Option<f64>) {
        self.started
            .push((node, time.unwrap_or(self.now), offset.unwrap_or(0.0)));
    }

    fn stop_node(&mut self, node: NodeId, time: Option<f64>) {
        self.stopped.push((node, time.unwrap_or(self.now)));
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.connections.push((from, to));
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) {
        self.connections.retain(|&(a, b)| !(a == from && b == to));
    }

    fn connect_to_param(&mut self, from: NodeId, to: ParamId) {
        self.param_connections.push((from, to));
    }

    fn disconnect_from_param(&mut self, from: NodeId, to: ParamId) {
        self.param_connections
            .retain(|&(a, b)| !(a == from && b == to));
    }

    fn disconnect_all(&mut self, from: NodeId) {
        self.connections.retain(|&(a, _)| a != from);
        self.param_connections.retain(|&(a, _)| a != from);
    }

    fn param(&mut self, node: NodeId, name: &str) -> ParamId {
        if let Some((id, _, _)) = self
            .params
            .iter()
            .find(|(_, n, pname)| *n == node && pname == name)
        {
            return *id;
        }
        let id = ParamId(self.mint());
        self.params.push((id, node, name.to_owned()));
        id
    }

    fn set_param(&mut self, param: ParamId, value: f64) {
        self.param_values.insert(param, value);
    }

    fn set_param_at_time(&mut self, param: ParamId, value: f64, time: f64) {
        self.automation
            .push(AutomationEvent::SetValueAtTime { param, value, time });
    }

    fn cancel_scheduled_values(&mut self, param: ParamId, time: f64) {
        self.automation
            .push(AutomationEvent::CancelScheduledValues { param, time });
    }

    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) {
        self.attributes
            .push((node, key.to_owned(), value.to_owned()));
    }

    fn load_buffer(&mut self, node: NodeId, data: &[u8]) {
        self.buffers.push((node, data.len()));
    }
}
