//! TCP serving loop for the endpoint agent.
//!
//! The agent answers one connection at a time: read one request, dispatch
//! it, write one response, close. Between connections the same task samples
//! the debounced inputs every `sample_period`, so a button press is caught
//! even when nobody is asking for status.
//!
//! ```text
//! controller ──(HTTP/1.1)──> AgentServer ──> DeviceAgent ──> Board
//!                                 │
//!                                 └── sample_inputs() every sample_period
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use parklink_agent::{AgentConfig, AgentServer, DeviceAgent};
//! use parklink_hardware::mock::MockBoard;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::default();
//! let (board, _mock) = MockBoard::build(config.debounce)?;
//! let agent = DeviceAgent::new(board)?;
//!
//! let server = AgentServer::bind(config, agent).await?;
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parklink_core::constants::{DEFAULT_DEBOUNCE_MS, DEFAULT_PORT, DEFAULT_SAMPLE_PERIOD_MS};
use parklink_hardware::HardwareError;
use parklink_protocol::AgentCodec;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{MissedTickBehavior, timeout};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, trace, warn};

use crate::dispatch::{DeviceAgent, error_response};

/// Configuration for the agent server.
///
/// # Example
///
/// ```
/// use parklink_agent::AgentConfig;
/// use std::time::Duration;
///
/// let config = AgentConfig {
///     bind_addr: "0.0.0.0:8080".parse().unwrap(),
///     ..AgentConfig::default()
/// };
/// assert_eq!(config.debounce, Duration::from_millis(150));
/// ```
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Minimum time between accepted input level changes
    pub debounce: Duration,

    /// How often inputs are sampled between requests
    pub sample_period: Duration,

    /// Bound on reading a request and writing its response
    pub io_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            sample_period: Duration::from_millis(DEFAULT_SAMPLE_PERIOD_MS),
            io_timeout: Duration::from_secs(5),
        }
    }
}

/// Errors that can occur while running the agent server
#[derive(Debug, Error)]
pub enum AgentError {
    /// Failed to bind to address
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The board could not be brought up
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// Peer took longer than the configured bound
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec error while framing a message
    #[error("Codec error: {0}")]
    Codec(String),
}

/// Single-connection-at-a-time HTTP server in front of a [`DeviceAgent`].
pub struct AgentServer {
    listener: TcpListener,
    agent: DeviceAgent,
    config: AgentConfig,
}

impl AgentServer {
    /// Bind the listener. The agent is served once [`AgentServer::serve`]
    /// is awaited.
    pub async fn bind(config: AgentConfig, agent: DeviceAgent) -> Result<Self, AgentError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| AgentError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        info!(
            addr = %listener.local_addr()?,
            debounce_ms = config.debounce.as_millis() as u64,
            sample_period_ms = config.sample_period.as_millis() as u64,
            "Agent listening"
        );

        Ok(Self {
            listener,
            agent,
            config,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, AgentError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn agent(&self) -> &DeviceAgent {
        &self.agent
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Serve forever.
    pub async fn serve(self) -> Result<(), AgentError> {
        self.serve_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Connection and accept failures are logged and the loop keeps going.
    /// Only binding can fail fatally, and that happens in [`AgentServer::bind`].
    pub async fn serve_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), AgentError> {
        tokio::pin!(shutdown);

        let mut sampler = tokio::time::interval(self.config.sample_period.max(MIN_SAMPLE_PERIOD));
        sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Agent shutting down");
                    return Ok(());
                }
                _ = sampler.tick() => {
                    match self.agent.sample_inputs() {
                        Ok(true) => trace!(state = ?self.agent.board().state(), "Inputs changed"),
                        Ok(false) => {}
                        Err(e) => warn!(error = %e, "Input sampling failed"),
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            let pause = accept_backoff(&e);
                            warn!(error = %e, backoff_ms = pause.as_millis() as u64, "Accept failed");
                            if !pause.is_zero() {
                                tokio::time::sleep(pause).await;
                            }
                            continue;
                        }
                    };
                    if let Err(e) = self.handle_connection(stream, peer).await {
                        warn!(%peer, error = %e, "Connection failed");
                    }
                }
            }
        }
    }

    /// Read one request, answer it, close.
    async fn handle_connection(
        &mut self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), AgentError> {
        debug!(%peer, "Accepted connection");
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%peer, "Failed to set TCP_NODELAY: {}", e);
        }

        let io_timeout = self.config.io_timeout;
        let mut framed = Framed::new(stream, AgentCodec::new());

        let response = match timeout(io_timeout, framed.next()).await {
            Ok(Some(Ok(request))) => self.agent.handle(&request),
            Ok(Some(Err(e))) => {
                error!(%peer, error = %e, "Failed to decode request");
                error_response(500, &e.to_string())
            }
            Ok(None) => {
                debug!(%peer, "Connection closed before a request");
                return Ok(());
            }
            Err(_) => return Err(AgentError::Timeout(io_timeout.as_millis() as u64)),
        };

        trace!(%peer, status = response.status, "Sending response");
        match timeout(io_timeout, framed.send(response)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AgentError::Codec(e.to_string())),
            Err(_) => Err(AgentError::Timeout(io_timeout.as_millis() as u64)),
        }
    }
}

/// Shortest input sampling period the loop will use.
const MIN_SAMPLE_PERIOD: Duration = Duration::from_millis(1);

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long to wait after `error` before the next accept. A peer that gave
/// up mid-handshake needs no pause; anything else (descriptor exhaustion,
/// for one) gets [`ACCEPT_BACKOFF`] so the loop does not spin.
fn accept_backoff(error: &std::io::Error) -> Duration {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::ConnectionAborted
        | ErrorKind::ConnectionReset
        | ErrorKind::Interrupted
        | ErrorKind::WouldBlock => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Error as IoError, ErrorKind};

    #[rstest]
    #[case(ErrorKind::ConnectionAborted, Duration::ZERO)]
    #[case(ErrorKind::ConnectionReset, Duration::ZERO)]
    #[case(ErrorKind::Interrupted, Duration::ZERO)]
    #[case(ErrorKind::OutOfMemory, ACCEPT_BACKOFF)]
    #[case(ErrorKind::Other, ACCEPT_BACKOFF)]
    fn test_accept_errors_are_not_fatal(#[case] kind: ErrorKind, #[case] expected: Duration) {
        assert_eq!(accept_backoff(&IoError::from(kind)), expected);
    }

    #[test]
    fn test_descriptor_exhaustion_backs_off() {
        // EMFILE on Linux.
        assert_eq!(accept_backoff(&IoError::from_raw_os_error(24)), ACCEPT_BACKOFF);
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.sample_period, Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_sample_period_serves() {
        let (board, _mock) =
            parklink_hardware::mock::MockBoard::build(Duration::from_millis(150)).unwrap();
        let agent = DeviceAgent::new(board).unwrap();
        let config = AgentConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            sample_period: Duration::ZERO,
            ..AgentConfig::default()
        };

        let server = AgentServer::bind(config, agent).await.unwrap();
        server
            .serve_until(tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_reports_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let (board, _mock) =
            parklink_hardware::mock::MockBoard::build(Duration::from_millis(150)).unwrap();
        let agent = DeviceAgent::new(board).unwrap();
        let config = AgentConfig {
            bind_addr: addr,
            ..AgentConfig::default()
        };

        let err = AgentServer::bind(config, agent).await.err().unwrap();
        assert!(matches!(err, AgentError::BindFailed { addr: a, .. } if a == addr));
    }
}
