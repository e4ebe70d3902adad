//! The patch graph registry and connect/disconnect protocol.

use std::collections::HashMap;

use crate::error::PatchError;
use crate::module::{Module, ModuleId};
use crate::port::{ModuleInput, ModuleOutput};

/// Logical address of an output port: module id plus output name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputId {
    /// Owning module.
    pub module: ModuleId,
    /// Output port name.
    pub output: String,
}

impl OutputId {
    /// Creates an output address.
    pub fn new(module: impl Into<ModuleId>, output: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            output: output.into(),
        }
    }
}

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.output)
    }
}

/// Logical address of an input port: module id plus input name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputId {
    /// Owning module.
    pub module: ModuleId,
    /// Input port name.
    pub input: String,
}

impl InputId {
    /// Creates an input address.
    pub fn new(module: impl Into<ModuleId>, input: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            input: input.into(),
        }
    }
}

impl std::fmt::Display for InputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.input)
    }
}

/// A logical edge in the patch graph.
///
/// Every recorded connection corresponds to exactly one active wiring at
/// the port level — the patcher only records after the port-level connect
/// succeeds, and removes the record when it tears the wiring down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Source endpoint.
    pub from: OutputId,
    /// Destination endpoint.
    pub to: InputId,
}

/// Owns all modules and the logical connection list of one patch graph.
///
/// The patcher is the sole entry point for structural changes: it
/// resolves logical endpoints into ports and delegates the actual wiring
/// to them (ports in turn delegate to the signal engine or the message
/// transport). All state is explicit — independent patchers never share
/// anything.
pub struct Patcher {
    modules: HashMap<ModuleId, Box<dyn Module>>,
    connections: Vec<Connection>,
}

impl std::fmt::Debug for Patcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patcher")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("connections", &self.connections)
            .finish()
    }
}

impl Patcher {
    /// Creates an empty patcher.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            connections: Vec::new(),
        }
    }

    /// Registers a module under its id.
    ///
    /// A duplicate id is rejected with [`PatchError::DuplicateModule`];
    /// silently replacing the prior entry would leak it undisposed. The
    /// rejected module is disposed before the error returns, so its
    /// engine-side nodes are not stranded either.
    pub fn add_module(&mut self, mut module: Box<dyn Module>) -> Result<(), PatchError> {
        let id = module.id().clone();
        if self.modules.contains_key(&id) {
            module.dispose();
            return Err(PatchError::DuplicateModule(id));
        }
        tracing::debug!("patcher_add: module {id}");
        self.modules.insert(id, module);
        Ok(())
    }

    /// Deletes a module: disconnects every connection referencing it (on
    /// both sides), removes those entries, disposes the module, and
    /// unregisters it.
    pub fn delete_module(&mut self, id: &ModuleId) -> Result<(), PatchError> {
        if !self.modules.contains_key(id) {
            return Err(PatchError::ModuleNotFound(id.clone()));
        }

        let affected: Vec<Connection> = self
            .connections
            .iter()
            .filter(|conn| conn.from.module == *id || conn.to.module == *id)
            .cloned()
            .collect();
        for conn in &affected {
            let output = Self::find_output(&self.modules, &conn.from)?;
            let input = Self::find_input(&self.modules, &conn.to)?;
            output.disconnect(Some(input))?;
        }
        self.connections
            .retain(|conn| conn.from.module != *id && conn.to.module != *id);

        if let Some(mut module) = self.modules.remove(id) {
            module.dispose();
        }
        tracing::debug!("patcher_remove: module {id}");
        Ok(())
    }

    /// Looks up a module.
    pub fn get_module(&self, id: &ModuleId) -> Result<&dyn Module, PatchError> {
        self.modules
            .get(id)
            .map(|module| module.as_ref())
            .ok_or_else(|| PatchError::ModuleNotFound(id.clone()))
    }

    /// Looks up a module mutably (for option updates).
    pub fn get_module_mut(&mut self, id: &ModuleId) -> Result<&mut (dyn Module + 'static), PatchError> {
        self.modules
            .get_mut(id)
            .map(|module| module.as_mut())
            .ok_or_else(|| PatchError::ModuleNotFound(id.clone()))
    }

    /// Connects an output port to an input port.
    ///
    /// Both endpoints are resolved first ([`PatchError::ModuleNotFound`] /
    /// [`PatchError::OutputNotFound`] / [`PatchError::InputNotFound`]
    /// abort with no graph mutation), then the output port performs the
    /// wiring. The logical connection is recorded only on success, so a
    /// [`PatchError::TypeMismatch`] never leaves a stale edge behind.
    /// Duplicate connections between the same pair are allowed and
    /// produce duplicate fan-out.
    pub fn connect(&mut self, from: &OutputId, to: &InputId) -> Result<(), PatchError> {
        let output = Self::find_output(&self.modules, from)?;
        let input = Self::find_input(&self.modules, to)?;
        output.connect(input)?;
        tracing::debug!("patcher_connect: {from} → {to}");
        self.connections.push(Connection {
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }

    /// Disconnects one pairing, or — when `to` is `None` — every wiring
    /// at the output port.
    ///
    /// All matching connection entries are removed (there may be more
    /// than one). Disconnecting an already-disconnected port is a no-op,
    /// not an error.
    pub fn disconnect(&mut self, from: &OutputId, to: Option<&InputId>) -> Result<(), PatchError> {
        let output = Self::find_output(&self.modules, from)?;
        match to {
            Some(to) => {
                let input = Self::find_input(&self.modules, to)?;
                output.disconnect(Some(input))?;
                self.connections
                    .retain(|conn| !(conn.from == *from && conn.to == *to));
                tracing::debug!("patcher_disconnect: {from} → {to}");
            }
            None => {
                output.disconnect(None)?;
                self.connections.retain(|conn| conn.from != *from);
                tracing::debug!("patcher_disconnect: {from} (all)");
            }
        }
        Ok(())
    }

    /// Disposes and removes every module (each through the same cascade
    /// as [`delete_module`](Self::delete_module)), then resets the
    /// connection list.
    pub fn clear(&mut self) {
        let ids: Vec<ModuleId> = self.modules.keys().cloned().collect();
        for id in ids {
            if let Err(err) = self.delete_module(&id) {
                tracing::warn!("patcher_clear: failed to delete {id}: {err}");
            }
        }
        self.connections.clear();
    }

    /// The logical connection list.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Registered module ids, sorted for deterministic iteration.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.modules.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    fn find_output<'a>(
        modules: &'a HashMap<ModuleId, Box<dyn Module>>,
        id: &OutputId,
    ) -> Result<&'a ModuleOutput, PatchError> {
        let module = modules
            .get(&id.module)
            .ok_or_else(|| PatchError::ModuleNotFound(id.module.clone()))?;
        module
            .output(&id.output)
            .ok_or_else(|| PatchError::OutputNotFound {
                module: id.module.clone(),
                name: id.output.clone(),
            })
    }

    fn find_input<'a>(
        modules: &'a HashMap<ModuleId, Box<dyn Module>>,
        id: &InputId,
    ) -> Result<&'a ModuleInput, PatchError> {
        let module = modules
            .get(&id.module)
            .ok_or_else(|| PatchError::ModuleNotFound(id.module.clone()))?;
        module
            .input(&id.input)
            .ok_or_else(|| PatchError::InputNotFound {
                module: id.module.clone(),
                name: id.input.clone(),
            })
    }
}

impl Default for Patcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MessageInputNode, MessageOutputNode, TimerHandle, TimerQueue};
    use crate::engine::{EngineHandle, NodeId, NullEngine, SignalEngine};
    use crate::module::{ModuleOptions, options_to_map};
    use crate::port::{ModuleInput, ModuleOutput};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Rig {
        null: Rc<RefCell<NullEngine>>,
        engine: EngineHandle,
        timers: TimerHandle,
    }

    fn rig() -> Rig {
        let null = Rc::new(RefCell::new(NullEngine::new()));
        let engine = Rc::clone(&null) as EngineHandle;
        Rig {
            null,
            engine,
            timers: Rc::new(RefCell::new(TimerQueue::new())),
        }
    }

    /// One engine node with a signal input "in" and a signal output "out".
    struct SignalStub {
        id: ModuleId,
        engine: EngineHandle,
        node: NodeId,
        inputs: Vec<ModuleInput>,
        outputs: Vec<ModuleOutput>,
        disposed: Rc<RefCell<bool>>,
    }

    impl SignalStub {
        fn new(rig: &Rig, id: &str) -> (Box<Self>, Rc<RefCell<bool>>) {
            let node = rig.engine.borrow_mut().create_node("gain");
            let disposed = Rc::new(RefCell::new(false));
            let stub = Box::new(Self {
                id: ModuleId::from(id),
                engine: Rc::clone(&rig.engine),
                node,
                inputs: vec![ModuleInput::signal("in", node)],
                outputs: vec![ModuleOutput::signal("out", node, Rc::clone(&rig.engine))],
                disposed: Rc::clone(&disposed),
            });
            (stub, disposed)
        }
    }

    impl Module for SignalStub {
        fn id(&self) -> &ModuleId {
            &self.id
        }
        fn category(&self) -> &'static str {
            "stub"
        }
        fn inputs(&self) -> &[ModuleInput] {
            &self.inputs
        }
        fn outputs(&self) -> &[ModuleOutput] {
            &self.outputs
        }
        fn options(&self) -> ModuleOptions {
            options_to_map(&serde_json::json!({}))
        }
        fn update_options(&mut self, _patch: &ModuleOptions) {}
        fn dispose(&mut self) {
            *self.disposed.borrow_mut() = true;
            self.engine.borrow_mut().free_node(self.node);
        }
    }

    /// A message-bus module with output "msg-out" and input "msg-in".
    struct MessageStub {
        id: ModuleId,
        inputs: Vec<ModuleInput>,
        outputs: Vec<ModuleOutput>,
    }

    impl MessageStub {
        fn new(rig: &Rig, id: &str) -> Box<Self> {
            let out = MessageOutputNode::new(Rc::clone(&rig.engine));
            let handler = MessageInputNode::new(Rc::clone(&rig.timers), |_, _| {});
            Box::new(Self {
                id: ModuleId::from(id),
                inputs: vec![ModuleInput::message("msg-in", handler)],
                outputs: vec![ModuleOutput::message("msg-out", out)],
            })
        }
    }

    impl Module for MessageStub {
        fn id(&self) -> &ModuleId {
            &self.id
        }
        fn category(&self) -> &'static str {
            "msg-stub"
        }
        fn inputs(&self) -> &[ModuleInput] {
            &self.inputs
        }
        fn outputs(&self) -> &[ModuleOutput] {
            &self.outputs
        }
        fn options(&self) -> ModuleOptions {
            ModuleOptions::new()
        }
        fn update_options(&mut self, _patch: &ModuleOptions) {}
        fn dispose(&mut self) {}
    }

    #[test]
    fn connect_then_delete_source_cleans_the_graph() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, a_disposed) = SignalStub::new(&rig, "a");
        let (b, b_disposed) = SignalStub::new(&rig, "b");
        patcher.add_module(a).unwrap();
        patcher.add_module(b).unwrap();

        patcher
            .connect(&OutputId::new("a", "out"), &InputId::new("b", "in"))
            .unwrap();
        assert_eq!(patcher.connections().len(), 1);
        assert_eq!(rig.null.borrow().connection_count(), 1);

        patcher.delete_module(&ModuleId::from("a")).unwrap();
        assert_eq!(patcher.connections().len(), 0);
        assert_eq!(rig.null.borrow().connection_count(), 0);
        assert!(*a_disposed.borrow());
        assert!(!*b_disposed.borrow());
        assert!(patcher.get_module(&ModuleId::from("b")).is_ok());
    }

    #[test]
    fn duplicate_module_id_is_rejected() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, _) = SignalStub::new(&rig, "a");
        let (dup, dup_disposed) = SignalStub::new(&rig, "a");
        patcher.add_module(a).unwrap();
        assert!(matches!(
            patcher.add_module(dup),
            Err(PatchError::DuplicateModule(_))
        ));
        assert_eq!(patcher.module_count(), 1);
        // The rejected module was disposed, not stranded.
        assert!(*dup_disposed.borrow());
    }

    #[test]
    fn unknown_endpoints_abort_without_mutation() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, _) = SignalStub::new(&rig, "a");
        patcher.add_module(a).unwrap();

        let err = patcher
            .connect(&OutputId::new("a", "out"), &InputId::new("ghost", "in"))
            .unwrap_err();
        assert!(matches!(err, PatchError::ModuleNotFound(_)));

        let err = patcher
            .connect(&OutputId::new("a", "nope"), &InputId::new("a", "in"))
            .unwrap_err();
        assert!(matches!(err, PatchError::OutputNotFound { .. }));

        assert!(patcher.connections().is_empty());
        assert_eq!(rig.null.borrow().connection_count(), 0);
    }

    #[test]
    fn type_mismatch_records_nothing() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, _) = SignalStub::new(&rig, "a");
        let m = MessageStub::new(&rig, "m");
        patcher.add_module(a).unwrap();
        patcher.add_module(m).unwrap();

        let err = patcher
            .connect(&OutputId::new("a", "out"), &InputId::new("m", "msg-in"))
            .unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch { .. }));
        assert!(patcher.connections().is_empty());

        let err = patcher
            .connect(&OutputId::new("m", "msg-out"), &InputId::new("a", "in"))
            .unwrap_err();
        assert!(matches!(err, PatchError::TypeMismatch { .. }));
        assert!(patcher.connections().is_empty());
    }

    #[test]
    fn disconnect_all_twice_is_a_no_op() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, _) = SignalStub::new(&rig, "a");
        let (b, _) = SignalStub::new(&rig, "b");
        patcher.add_module(a).unwrap();
        patcher.add_module(b).unwrap();
        patcher
            .connect(&OutputId::new("a", "out"), &InputId::new("b", "in"))
            .unwrap();

        patcher.disconnect(&OutputId::new("a", "out"), None).unwrap();
        patcher.disconnect(&OutputId::new("a", "out"), None).unwrap();
        assert!(patcher.connections().is_empty());
    }

    #[test]
    fn duplicate_connections_are_removed_together() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, _) = SignalStub::new(&rig, "a");
        let (b, _) = SignalStub::new(&rig, "b");
        patcher.add_module(a).unwrap();
        patcher.add_module(b).unwrap();

        let from = OutputId::new("a", "out");
        let to = InputId::new("b", "in");
        patcher.connect(&from, &to).unwrap();
        patcher.connect(&from, &to).unwrap();
        assert_eq!(patcher.connections().len(), 2);

        patcher.disconnect(&from, Some(&to)).unwrap();
        assert!(patcher.connections().is_empty());
    }

    #[test]
    fn clear_disposes_everything() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let (a, a_disposed) = SignalStub::new(&rig, "a");
        let (b, b_disposed) = SignalStub::new(&rig, "b");
        patcher.add_module(a).unwrap();
        patcher.add_module(b).unwrap();
        patcher
            .connect(&OutputId::new("a", "out"), &InputId::new("b", "in"))
            .unwrap();

        patcher.clear();
        assert_eq!(patcher.module_count(), 0);
        assert!(patcher.connections().is_empty());
        assert!(*a_disposed.borrow());
        assert!(*b_disposed.borrow());
        assert_eq!(rig.null.borrow().connection_count(), 0);
    }

    #[test]
    fn message_connections_fan_out_through_the_patcher() {
        let rig = rig();
        let mut patcher = Patcher::new();
        let src = MessageStub::new(&rig, "src");
        let dst = MessageStub::new(&rig, "dst");
        patcher.add_module(src).unwrap();
        patcher.add_module(dst).unwrap();

        patcher
            .connect(&OutputId::new("src", "msg-out"), &InputId::new("dst", "msg-in"))
            .unwrap();
        assert_eq!(patcher.connections().len(), 1);

        patcher.delete_module(&ModuleId::from("dst")).unwrap();
        assert!(patcher.connections().is_empty());
    }
}
