//! Patchbay Core - patch graph runtime for node-based audio patching
//!
//! This crate is the runtime behind a visual patcher: a graph of
//! interchangeable processing modules wired together by the user, where
//! some links carry continuous signal and others carry discrete,
//! timestamped messages. The modules themselves are thin wrappers around
//! an external signal engine — the machinery that matters lives here.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`Patcher`] - module registry plus the logical connection list; the
//!   sole entry point for structural changes
//! - [`Module`] - a named unit owning ports, an options record, and
//!   lifecycle hooks
//! - [`ModuleInput`] / [`ModuleOutput`] - named, category-tagged ports
//!
//! ## Dual transport
//!
//! Two incompatible wiring kinds, checked at the port boundary:
//!
//! - **Signal** connections are wired into the external engine
//!   ([`SignalEngine`]) and rendered there at audio rate
//! - **Message-bus** connections fan timestamped events out from a
//!   [`MessageOutputNode`] to destinations, with replay-on-connect and
//!   cancellation; timer-based destinations accept millisecond jitter,
//!   parameter destinations use sample-accurate engine automation
//!
//! ## Resources
//!
//! - [`ResourceManager`] - name-keyed, reference-counted registry of
//!   externally loaded binary data with revocable handles
//!
//! ## Session
//!
//! - [`PatchContext`] - explicit per-session bundle (engine, timers,
//!   resources); no process-wide state anywhere
//!
//! # Concurrency Model
//!
//! Execution is single-threaded and cooperative. "Scheduling" means
//! registering a callback against a future timestamp; the host drives
//! delivery with [`PatchContext::pump`]. Message delivery is best-effort
//! by design and may drift under load — sample-accurate guarantees exist
//! only on the engine automation path.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{NullEngine, PatchContext, Patcher};
//!
//! let ctx = PatchContext::new(NullEngine::new());
//! let patcher = Patcher::new();
//! // Modules are created by a factory (see the registry crate) and
//! // registered here; connections are made by module id + port name.
//! assert_eq!(patcher.module_count(), 0);
//! drop((ctx, patcher));
//! ```

pub mod bus;
pub mod context;
pub mod engine;
pub mod error;
pub mod message;
pub mod module;
pub mod patcher;
pub mod port;
pub mod resource;

pub use bus::{
    MessageCallback, MessageDestination, MessageEvent, MessageInputNode, MessageOutputNode,
    OwnerId, ParamEndpoint, TimerEntry, TimerHandle, TimerQueue, TimerSink,
};
pub use context::PatchContext;
pub use engine::{AutomationEvent, EngineHandle, NodeId, NullEngine, ParamId, SignalEngine};
pub use error::PatchError;
pub use message::Message;
pub use module::{
    ChangeListener, Module, ModuleId, ModuleOptions, options_from_map, options_to_map,
};
pub use patcher::{Connection, InputId, OutputId, Patcher};
pub use port::{ConnectionType, InputKind, ModuleInput, ModuleOutput, OutputKind};
pub use resource::{ResourceHandle, ResourceManager};
