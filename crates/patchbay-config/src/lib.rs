//! Patch document persistence for patchbay.
//!
//! This crate owns the shape a patch session travels in: a JSON document
//! of modules (id, category, options, editor position) and named
//! connections, plus a separate bundle of named binary resources. It can
//! rebuild a full [`Patcher`](patchbay_core::Patcher) from a document —
//! resources first, then modules through the registry, then connections
//! replayed by name — and capture a live patcher back into a document.
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::PatchDocument;
//! use patchbay_core::{NullEngine, PatchContext};
//! use patchbay_registry::ModuleRegistry;
//! use std::collections::HashMap;
//!
//! let json = r#"{
//!     "modules": [
//!         { "moduleId": "osc-1", "category": "oscillator" },
//!         { "moduleId": "out-1", "category": "speaker-output" }
//!     ],
//!     "connections": [
//!         {
//!             "from": { "moduleId": "osc-1", "outputName": "osc-signal-output" },
//!             "to": { "moduleId": "out-1", "inputName": "input" }
//!         }
//!     ]
//! }"#;
//!
//! let ctx = PatchContext::new(NullEngine::new());
//! let registry = ModuleRegistry::new();
//! let doc = PatchDocument::from_json(json).unwrap();
//! let patcher = doc.instantiate(&ctx, &registry, &HashMap::new()).unwrap();
//! assert_eq!(patcher.module_count(), 2);
//! assert_eq!(patcher.connections().len(), 1);
//! ```

mod document;
mod error;

pub use document::{
    ConnectionEntry, InputRef, ModuleEntry, OutputRef, PatchDocument, Position, release_bundle,
};
pub use error::DocumentError;

/// Re-export commonly used types from patchbay-registry
pub use patchbay_registry::{ModuleDescriptor, ModuleGroup, ModuleRegistry};
