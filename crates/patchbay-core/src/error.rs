//! Error types for patch graph operations.

use thiserror::Error;

use crate::module::ModuleId;
use crate::port::ConnectionType;

/// Errors that can occur while mutating a patch graph or registering
/// resources.
///
/// Every operation in this crate is local, synchronous, and in-memory;
/// a failed operation leaves the graph unchanged and is never retried.
#[derive(Debug, Error)]
pub enum PatchError {
    /// No module with the given id is registered in the patcher.
    #[error("module not found: {0}")]
    ModuleNotFound(ModuleId),

    /// A module with the given id is already registered.
    #[error("module '{0}' is already registered")]
    DuplicateModule(ModuleId),

    /// The named output does not exist on the module.
    #[error("output '{name}' not found in module '{module}'")]
    OutputNotFound {
        /// Module that was searched.
        module: ModuleId,
        /// Output name that was requested.
        name: String,
    },

    /// The named input does not exist on the module.
    #[error("input '{name}' not found in module '{module}'")]
    InputNotFound {
        /// Module that was searched.
        module: ModuleId,
        /// Input name that was requested.
        name: String,
    },

    /// A signal port was paired with a message-bus port (or vice versa).
    /// No wiring occurs and no connection is recorded.
    #[error("cannot connect {output_type} output '{output}' to {input_type} input '{input}'")]
    TypeMismatch {
        /// Name of the output port.
        output: String,
        /// Name of the input port.
        input: String,
        /// Connection category of the output port.
        output_type: ConnectionType,
        /// Connection category of the input port.
        input_type: ConnectionType,
    },

    /// A resource was registered with empty data.
    #[error("invalid resource '{name}': resource data must not be empty")]
    InvalidResource {
        /// Name the resource was registered under.
        name: String,
    },
}
