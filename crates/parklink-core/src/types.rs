use crate::{
    Result,
    constants::{DEFAULT_PORT, DEFAULT_TIMEOUT_SECS},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identity of one remote endpoint: address, port and per-request timeout.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    address: String,
    port: u16,
    timeout: Duration,
}

impl DeviceEndpoint {
    /// Create an endpoint with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidEndpoint` if the address is empty, contains
    /// whitespace or a port separator, or the timeout is zero.
    pub fn new(address: impl Into<String>, port: u16, timeout: Duration) -> Result<Self> {
        let address = address.into().trim().to_string();

        if address.is_empty() {
            return Err(Error::InvalidEndpoint("address is empty".to_string()));
        }
        if address.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(Error::InvalidEndpoint(format!(
                "address contains invalid characters: {address}"
            )));
        }
        if timeout.is_zero() {
            return Err(Error::InvalidEndpoint(format!(
                "timeout must be non-zero for {address}"
            )));
        }

        Ok(Self {
            address,
            port,
            timeout,
        })
    }

    /// Endpoint on the default port with the default timeout.
    pub fn with_defaults(address: impl Into<String>) -> Result<Self> {
        Self::new(
            address,
            DEFAULT_PORT,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `address:port`, suitable for `TcpStream::connect`.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// `http://address:port`
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.authority())
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}
