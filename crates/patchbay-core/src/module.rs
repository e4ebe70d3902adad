//! The module trait: a named processing unit with ports and options.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::port::{ModuleInput, ModuleOutput};

/// Stable identifier of a module within one patcher.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    /// Creates a module id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ModuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A module's options record: string-keyed JSON values, the shape the
/// persistence collaborator consumes and produces.
pub type ModuleOptions = serde_json::Map<String, serde_json::Value>;

/// Callback a module may use to push live option changes upward to a UI
/// model.
pub type ChangeListener = Box<dyn Fn(&ModuleId, &ModuleOptions)>;

/// A named processing unit owning input and output ports.
///
/// Modules are thin parameter wrappers around the external signal engine;
/// the interesting machinery (wiring, transport, resources) lives in this
/// crate and the engine. A module's id is stable for its lifetime and
/// unique within its patcher.
pub trait Module {
    /// The module's id.
    fn id(&self) -> &ModuleId;

    /// The category tag the module was created from (factory key).
    fn category(&self) -> &'static str;

    /// Input ports, in declaration order. Names are unique within the
    /// list.
    fn inputs(&self) -> &[ModuleInput];

    /// Output ports, in declaration order. Names are unique within the
    /// list.
    fn outputs(&self) -> &[ModuleOutput];

    /// A snapshot of the current options record.
    fn options(&self) -> ModuleOptions;

    /// Applies a partial options record. Unknown keys are ignored.
    fn update_options(&mut self, patch: &ModuleOptions);

    /// Releases engine-side nodes and any held resource handles. Called
    /// by the patcher after all connections to the module are gone.
    fn dispose(&mut self);

    /// Installs the optional UI change callback. Default: discarded.
    fn set_change_listener(&mut self, _listener: ChangeListener) {}

    /// Finds an input port by name.
    fn input(&self, name: &str) -> Option<&ModuleInput> {
        self.inputs().iter().find(|input| input.name() == name)
    }

    /// Finds an output port by name.
    fn output(&self, name: &str) -> Option<&ModuleOutput> {
        self.outputs().iter().find(|output| output.name() == name)
    }
}

/// Serializes a typed options struct into the JSON record shape.
pub fn options_to_map<T: Serialize>(options: &T) -> ModuleOptions {
    match serde_json::to_value(options) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => ModuleOptions::new(),
    }
}

/// Deserializes a typed options struct from an optional JSON record,
/// falling back to defaults when absent or malformed.
pub fn options_from_map<T: DeserializeOwned + Default>(map: Option<&ModuleOptions>) -> T {
    match map {
        None => T::default(),
        Some(map) => match serde_json::from_value(serde_json::Value::Object(map.clone())) {
            Ok(options) => options,
            Err(err) => {
                tracing::warn!("invalid module options, using defaults: {err}");
                T::default()
            }
        },
    }
}
