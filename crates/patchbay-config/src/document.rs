//! Patch document format and operations.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use patchbay_core::{InputId, Module, ModuleId, ModuleOptions, OutputId, PatchContext, Patcher};
use patchbay_registry::ModuleRegistry;

use crate::error::DocumentError;

/// Editor position of a module, carried through persistence untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal position in editor units.
    pub x: f64,
    /// Vertical position in editor units.
    pub y: f64,
}

/// One module in a patch document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    /// The module's id, unique within the document.
    pub module_id: ModuleId,
    /// Category tag resolved through the module registry.
    pub category: String,
    /// The module's options record.
    #[serde(default)]
    pub options: ModuleOptions,
    /// Editor position.
    #[serde(default)]
    pub position: Position,
}

/// Source endpoint of a stored connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRef {
    /// Source module id.
    pub module_id: ModuleId,
    /// Output port name on the source module.
    pub output_name: String,
}

/// Destination endpoint of a stored connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRef {
    /// Destination module id.
    pub module_id: ModuleId,
    /// Input port name on the destination module.
    pub input_name: String,
}

/// One logical connection in a patch document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    /// Source endpoint.
    pub from: OutputRef,
    /// Destination endpoint.
    pub to: InputRef,
}

/// A complete patch graph as persisted: modules, connections, and a
/// format version tag.
///
/// The document is JSON on the wire (camelCase keys). Binary resources
/// travel separately as a name → bytes bundle; the document's module
/// options reference them by name.
///
/// # JSON Format
///
/// ```json
/// {
///   "version": "0.1.0",
///   "modules": [
///     {
///       "moduleId": "osc-1",
///       "category": "oscillator",
///       "options": { "frequency": 220.0, "waveform": "saw" },
///       "position": { "x": 120.0, "y": 80.0 }
///     }
///   ],
///   "connections": [
///     {
///       "from": { "moduleId": "osc-1", "outputName": "osc-signal-output" },
///       "to": { "moduleId": "out-1", "inputName": "input" }
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchDocument {
    /// Version of the application that wrote the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Modules in the patch.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,

    /// Logical connections between module ports.
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

impl PatchDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document to pretty JSON.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| DocumentError::read_file(path, e))?;
        Self::from_json(&content)
    }

    /// Save the document to a JSON file, creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::create_dir(parent, e))?;
        }

        let content = self.to_json()?;
        std::fs::write(path, content).map_err(|e| DocumentError::write_file(path, e))?;
        Ok(())
    }

    /// Rebuilds a full patcher from this document.
    ///
    /// Reconstruction order matters and is fixed: resources from `bundle`
    /// are registered first (so module options that name them resolve),
    /// then each module is created through the registry, then the
    /// connections are replayed by name through [`Patcher::connect`].
    ///
    /// Each registered resource leaves one document-owned reference in
    /// the session's registry; the caller releases those when it unloads
    /// the patch. A resource named by a module but missing from the
    /// bundle is non-fatal (the module warns and stays unloaded); an
    /// unknown module category or a failed connection aborts with an
    /// error.
    pub fn instantiate(
        &self,
        ctx: &PatchContext,
        registry: &ModuleRegistry,
        bundle: &HashMap<String, Vec<u8>>,
    ) -> Result<Patcher, DocumentError> {
        let mut names: Vec<&String> = bundle.keys().collect();
        names.sort();
        for name in names {
            ctx.resources()
                .borrow_mut()
                .register_resource(name, bundle[name].clone())
                .map_err(DocumentError::from)?;
        }

        let mut patcher = Patcher::new();
        for entry in &self.modules {
            let module = registry
                .create(
                    ctx,
                    &entry.category,
                    entry.module_id.clone(),
                    Some(&entry.options),
                )
                .ok_or_else(|| DocumentError::UnknownCategory(entry.category.clone()))?;
            patcher.add_module(module)?;
        }

        for conn in &self.connections {
            patcher.connect(
                &OutputId::new(conn.from.module_id.clone(), conn.from.output_name.clone()),
                &InputId::new(conn.to.module_id.clone(), conn.to.input_name.clone()),
            )?;
        }

        tracing::debug!(
            "document_instantiate: {} modules, {} connections",
            self.modules.len(),
            self.connections.len()
        );
        Ok(patcher)
    }

    /// Captures a patcher as a document.
    ///
    /// Positions come from the editor layer; `position_for` supplies one
    /// per module id (return `Position::default()` for headless use).
    pub fn snapshot(
        patcher: &Patcher,
        mut position_for: impl FnMut(&ModuleId) -> Position,
    ) -> Self {
        let mut modules = Vec::with_capacity(patcher.module_count());
        for id in patcher.module_ids() {
            // module_ids only returns live ids; the lookup cannot fail.
            let Ok(module) = patcher.get_module(&id) else {
                continue;
            };
            modules.push(ModuleEntry {
                module_id: id.clone(),
                category: module.category().to_owned(),
                options: module.options(),
                position: position_for(&id),
            });
        }

        let connections = patcher
            .connections()
            .iter()
            .map(|conn| ConnectionEntry {
                from: OutputRef {
                    module_id: conn.from.module.clone(),
                    output_name: conn.from.output.clone(),
                },
                to: InputRef {
                    module_id: conn.to.module.clone(),
                    input_name: conn.to.input.clone(),
                },
            })
            .collect();

        Self {
            version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            modules,
            connections,
        }
    }
}

/// Releases the document-owned resource references acquired by
/// [`PatchDocument::instantiate`], one per bundle name.
pub fn release_bundle(ctx: &PatchContext, bundle: &HashMap<String, Vec<u8>>) {
    for name in bundle.keys() {
        ctx.resources().borrow_mut().release_resource(name);
    }
}
