//! Endpoint side of the parking link.
//!
//! [`DeviceAgent`] owns the hardware-state model and maps the two protocol
//! routes onto it; [`AgentServer`] puts it behind a TCP listener and samples
//! the inputs between requests.

pub mod dispatch;
pub mod server;

pub use dispatch::{DeviceAgent, DispatchError, snapshot_of};
pub use server::{AgentConfig, AgentError, AgentServer};
