//! Controller-side link to one endpoint.
//!
//! A [`DeviceLink`] is constructed [`Inactive`](ConnectionState::Inactive).
//! While inactive it never touches the network: commands are acknowledged
//! with a simulated success so the business layer can run with no endpoint
//! present. [`DeviceLink::activate`] probes the endpoint and moves the link to
//! `Connected` or `Disconnected`; [`DeviceLink::deactivate`] forces it back.
//!
//! ```text
//!             activate() ok            check/command: refused
//! Inactive ──────────────────> Connected ──────────────────> Disconnected
//!    ^  │    activate() fails                                    │  ^
//!    │  └────────────────────────────────────────────────────────┘  │
//!    │                         check ok: back to Connected ─────────┘
//!    └──── deactivate() from any state
//! ```
//!
//! Public operations never return `Err`. Failures are recorded as the
//! link's last error and reported as `false`, `None` or a
//! [`CommandOutcome`].
//!
//! # Example Usage
//!
//! ```no_run
//! use parklink_core::DeviceEndpoint;
//! use parklink_network::DeviceLink;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut link = DeviceLink::new(DeviceEndpoint::with_defaults("192.168.1.119")?);
//!
//! // Inactive: simulated, no network call.
//! assert!(link.toggle_barrier().await);
//!
//! if link.activate().await {
//!     link.update_display(4).await;
//!     if let Some(status) = link.fetch_status().await {
//!         println!("servo at {}", status.servo);
//!     }
//! } else {
//!     println!("{}", link.connection_state_text());
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parklink_core::DeviceEndpoint;
use parklink_core::constants::DEFAULT_CHECK_TIMEOUT_MS;
use parklink_protocol::{Command, HttpRequest, StatusSnapshot};
use tracing::{debug, info, warn};

use crate::events::LinkEventSink;
use crate::outcome::CommandOutcome;
use crate::transport::{self, TransportError};

/// Connection state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never activated, or deactivated. No network traffic.
    Inactive,
    /// Last check succeeded.
    Connected,
    /// Last check or command failed to connect.
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inactive => "Inactive",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
        })
    }
}

/// Configuration for a link
///
/// Commands and status fetches use the endpoint's own timeout; connection
/// checks use the shorter `check_timeout`.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Bound on a connection check
    pub check_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_millis(DEFAULT_CHECK_TIMEOUT_MS),
        }
    }
}

/// Link to one endpoint.
pub struct DeviceLink {
    endpoint: DeviceEndpoint,
    config: LinkConfig,
    state: ConnectionState,
    last_error: Option<String>,
    last_status: Option<StatusSnapshot>,
    last_contact: Option<DateTime<Utc>>,
    events: Option<Arc<dyn LinkEventSink>>,
}

impl DeviceLink {
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        Self::with_config(endpoint, LinkConfig::default())
    }

    pub fn with_config(endpoint: DeviceEndpoint, config: LinkConfig) -> Self {
        Self {
            endpoint,
            config,
            state: ConnectionState::Inactive,
            last_error: None,
            last_status: None,
            last_contact: None,
            events: None,
        }
    }

    /// Attach an event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn LinkEventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ConnectionState::Inactive
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Snapshot cached by the last successful [`DeviceLink::fetch_status`].
    pub fn last_status(&self) -> Option<&StatusSnapshot> {
        self.last_status.as_ref()
    }

    /// When the endpoint last answered anything.
    pub fn last_contact(&self) -> Option<DateTime<Utc>> {
        self.last_contact
    }

    /// Probe the endpoint and leave the inactive state.
    ///
    /// Returns `true` and moves to `Connected` if the endpoint answers the
    /// status query, otherwise records the reason and moves to
    /// `Disconnected`. Safe to call repeatedly.
    pub async fn activate(&mut self) -> bool {
        match self.probe().await {
            Ok(()) => {
                info!(addr = %self.endpoint, "Link activated");
                self.mark_connected();
                true
            }
            Err(reason) => {
                warn!(addr = %self.endpoint, %reason, "Link activation failed");
                self.mark_disconnected(reason);
                false
            }
        }
    }

    /// Return to `Inactive`. No network call.
    pub fn deactivate(&mut self) {
        if self.state != ConnectionState::Inactive {
            info!(addr = %self.endpoint, "Link deactivated");
        }
        self.state = ConnectionState::Inactive;
    }

    /// Re-check an active link.
    ///
    /// An inactive link reports `false` without a network call; use
    /// [`DeviceLink::activate`] to bring it up.
    pub async fn check_connection(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.probe().await {
            Ok(()) => {
                if self.state != ConnectionState::Connected {
                    info!(addr = %self.endpoint, "Link reconnected");
                }
                self.mark_connected();
                true
            }
            Err(reason) => {
                debug!(addr = %self.endpoint, %reason, "Connection check failed");
                self.mark_disconnected(reason);
                false
            }
        }
    }

    /// Send one command.
    ///
    /// Inactive links answer with a simulated acknowledgement and make no
    /// network call. Otherwise the reply is classified into a
    /// [`CommandOutcome`]; only a failure to connect demotes the link.
    pub async fn send_command(&mut self, command: &Command) -> CommandOutcome {
        let outcome = if self.is_active() {
            let request = HttpRequest::command(&self.endpoint.authority(), command.to_body());
            match transport::exchange(&self.endpoint, request, self.endpoint.timeout()).await {
                Ok(response) => {
                    self.last_contact = Some(Utc::now());
                    let outcome = CommandOutcome::from_response(&response);
                    self.last_error = if outcome.is_success() {
                        None
                    } else if !response.is_success() {
                        Some(format!("HTTP {}", response.status))
                    } else {
                        // 2xx carrying an error reply: keep the device's message.
                        Some(
                            outcome
                                .message
                                .clone()
                                .filter(|message| !message.is_empty())
                                .unwrap_or_else(|| format!("Device error (HTTP {})", response.status)),
                        )
                    };
                    outcome
                }
                Err(e) => {
                    self.record_transport_error(&e);
                    CommandOutcome::from_transport_error(&e)
                }
            }
        } else {
            CommandOutcome::simulated()
        };

        debug!(
            addr = %self.endpoint,
            action = command.action(),
            status = %outcome.status,
            "Command finished"
        );
        if let Some(events) = &self.events {
            events.on_command(&self.endpoint, command, &outcome);
        }
        outcome
    }

    /// Fetch and cache the endpoint's status.
    ///
    /// Returns `None` when inactive and on any failure; the failure is kept
    /// as the last error. Never changes the connection state.
    pub async fn fetch_status(&mut self) -> Option<StatusSnapshot> {
        if !self.is_active() {
            return None;
        }

        let request = HttpRequest::status_query(&self.endpoint.authority());
        let response =
            match transport::exchange(&self.endpoint, request, self.endpoint.timeout()).await {
                Ok(response) => response,
                Err(e) => {
                    debug!(addr = %self.endpoint, error = %e, "Status fetch failed");
                    self.last_error = Some(e.to_string());
                    return None;
                }
            };
        self.last_contact = Some(Utc::now());

        if response.status != 200 {
            self.last_error = Some(format!("HTTP {}", response.status));
            return None;
        }
        match serde_json::from_slice::<StatusSnapshot>(&response.body) {
            Ok(snapshot) => {
                self.last_error = None;
                self.last_status = Some(snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                self.last_error = Some(format!("Malformed status: {e}"));
                None
            }
        }
    }

    pub async fn occupy_space(&mut self, space: u32) -> bool {
        self.run(Command::occupy(space)).await
    }

    pub async fn release_space(&mut self, space: u32) -> bool {
        self.run(Command::release(space)).await
    }

    pub async fn toggle_indicator(&mut self, space: u32, color: &str) -> bool {
        self.run(Command::toggle_indicator(space, color)).await
    }

    pub async fn set_indicator(&mut self, index: u32, on: bool) -> bool {
        self.run(Command::set_indicator(index, on)).await
    }

    pub async fn toggle_barrier(&mut self) -> bool {
        self.run(Command::toggle_barrier()).await
    }

    pub async fn update_display(&mut self, digit: u32) -> bool {
        self.run(Command::update_display(digit)).await
    }

    pub async fn move_actuator(&mut self, angle: u16) -> bool {
        self.run(Command::move_actuator(angle)).await
    }

    /// Move the actuator on behalf of a button press.
    pub async fn move_actuator_button(&mut self, angle: u16) -> bool {
        self.run(Command::move_actuator_button(angle)).await
    }

    /// "Inactive", "Connected", the last error, or "Disconnected".
    pub fn connection_state_text(&self) -> String {
        match (self.state, &self.last_error) {
            (ConnectionState::Inactive, _) => ConnectionState::Inactive.to_string(),
            (ConnectionState::Connected, _) => ConnectionState::Connected.to_string(),
            (ConnectionState::Disconnected, Some(error)) => format!("Error: {error}"),
            (ConnectionState::Disconnected, None) => ConnectionState::Disconnected.to_string(),
        }
    }

    async fn run(&mut self, command: Command) -> bool {
        self.send_command(&command).await.is_success()
    }

    async fn probe(&self) -> Result<(), String> {
        let request = HttpRequest::status_query(&self.endpoint.authority());
        match transport::exchange(&self.endpoint, request, self.config.check_timeout).await {
            Ok(response) if response.status == 200 => Ok(()),
            Ok(response) => Err(format!("HTTP {}", response.status)),
            Err(e) => Err(e.to_string()),
        }
    }

    fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.last_error = None;
        self.last_contact = Some(Utc::now());
        if let Some(events) = &self.events {
            events.on_connected(&self.endpoint);
        }
    }

    fn mark_disconnected(&mut self, reason: String) {
        self.state = ConnectionState::Disconnected;
        if let Some(events) = &self.events {
            events.on_connection_failed(&self.endpoint, &reason);
        }
        self.last_error = Some(reason);
    }

    fn record_transport_error(&mut self, error: &TransportError) {
        if error.is_timeout() {
            warn!(addr = %self.endpoint, "Command timed out");
            self.last_error = Some("Timeout".to_string());
            return;
        }

        warn!(addr = %self.endpoint, %error, "Command failed");
        if error.is_unreachable() {
            self.mark_disconnected(error.to_string());
        } else {
            self.last_error = Some(error.to_string());
        }
    }
}

impl fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLink")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
