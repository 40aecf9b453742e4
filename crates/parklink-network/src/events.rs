//! Injected observer for link activity.
//!
//! A [`DeviceLink`](crate::DeviceLink) reports connection successes and
//! failures and every command it issues to an optional [`LinkEventSink`].
//! Statistics and logging live behind this trait instead of in process-wide
//! state.

use parklink_core::DeviceEndpoint;
use parklink_protocol::Command;
use tracing::{debug, info, warn};

use crate::outcome::CommandOutcome;

/// Receives link events. All methods default to doing nothing.
pub trait LinkEventSink: Send + Sync {
    fn on_connected(&self, _endpoint: &DeviceEndpoint) {}

    fn on_connection_failed(&self, _endpoint: &DeviceEndpoint, _reason: &str) {}

    fn on_command(&self, _endpoint: &DeviceEndpoint, _command: &Command, _outcome: &CommandOutcome) {
    }
}

/// Sink that writes every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl LinkEventSink for TracingEventSink {
    fn on_connected(&self, endpoint: &DeviceEndpoint) {
        info!(addr = %endpoint, "Endpoint connected");
    }

    fn on_connection_failed(&self, endpoint: &DeviceEndpoint, reason: &str) {
        warn!(addr = %endpoint, reason, "Endpoint connection failed");
    }

    fn on_command(&self, endpoint: &DeviceEndpoint, command: &Command, outcome: &CommandOutcome) {
        debug!(
            addr = %endpoint,
            action = command.action(),
            status = %outcome.status,
            message = outcome.message.as_deref().unwrap_or_default(),
            "Command issued"
        );
    }
}
