//! Controller side of the parking link.
//!
//! - [`DeviceLink`]: one endpoint's connection state, commands and status.
//! - [`LinkPool`]: a fixed set of links activated, checked and polled together.
//! - [`StatusPoller`]: periodic polling that reports button presses.
//! - [`LinkEventSink`]: injected observer for connection and command events.
//!
//! Every operation is one short-lived HTTP exchange bounded by a timeout; see
//! [`transport`].

pub mod events;
pub mod link;
pub mod outcome;
pub mod poller;
pub mod pool;
pub mod transport;

pub use events::{LinkEventSink, TracingEventSink};
pub use link::{ConnectionState, DeviceLink, LinkConfig};
pub use outcome::{CommandOutcome, LinkFault, OutcomeStatus};
pub use poller::{BarrierReaction, DeviceReport, InputEvent, InputHandler, StatusPoller};
pub use pool::{LinkPool, PoolConfig};
pub use transport::TransportError;
