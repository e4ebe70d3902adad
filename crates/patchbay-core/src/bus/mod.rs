//! Message-bus transport: scheduled, timestamped event fan-out.
//!
//! A message-bus connection carries discrete `{time, payload}` events from
//! a [`MessageOutputNode`] to one or more [`MessageDestination`]s. The
//! output side logs what it schedules so destinations that join
//! mid-performance can be caught up (**replay-on-connect**), and forwards
//! cancellations so a torn-down link leaves no stray deliveries behind.
//!
//! Two destination flavors exist on purpose (see [`input`]): timer-based
//! module callbacks, and sample-accurate engine automation for parameters
//! exposed to message control. Their differing precision guarantees are
//! part of the contract.

pub mod input;
pub mod output;
pub mod timer;

pub use input::{MessageCallback, MessageDestination, MessageInputNode, ParamEndpoint};
pub use output::{MessageEvent, MessageOutputNode};
pub use timer::{OwnerId, TimerEntry, TimerHandle, TimerQueue, TimerSink};
