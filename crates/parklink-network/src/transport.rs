//! One-shot HTTP exchange with an endpoint.
//!
//! Every link operation is a single request/response on a fresh TCP
//! connection: connect, send, read one response, drop. The whole exchange is
//! bounded by one timeout.
//!
//! # Error Classification
//!
//! | failure | variant |
//! |---------|---------|
//! | exchange exceeded the bound | [`TransportError::Timeout`] |
//! | TCP connect failed (refused, no route, bad host) | [`TransportError::Unreachable`] |
//! | peer closed before a full response | [`TransportError::ConnectionLost`] |
//! | bytes on the wire were not a valid response | [`TransportError::Codec`] |
//! | anything else at the socket level | [`TransportError::Io`] |
//!
//! Only `Unreachable` demotes a link; the link layer decides that, this module
//! only classifies.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parklink_core::DeviceEndpoint;
use parklink_protocol::{HttpRequest, HttpResponse, LinkCodec};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{trace, warn};

/// Errors that can occur during one exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange did not finish in time
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// TCP connection could not be established
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// Peer went away mid-exchange
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Response could not be framed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<parklink_core::Error> for TransportError {
    fn from(error: parklink_core::Error) -> Self {
        match error {
            parklink_core::Error::Io(e) => Self::Io(e),
            other => Self::Codec(other.to_string()),
        }
    }
}

/// Send `request` to `endpoint` and read its response within `limit`.
pub async fn exchange(
    endpoint: &DeviceEndpoint,
    request: HttpRequest,
    limit: Duration,
) -> Result<HttpResponse, TransportError> {
    match tokio::time::timeout(limit, exchange_inner(endpoint, request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(addr = %endpoint, "Exchange timeout after {}ms", limit.as_millis());
            Err(TransportError::Timeout(limit.as_millis() as u64))
        }
    }
}

async fn exchange_inner(
    endpoint: &DeviceEndpoint,
    request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let stream = TcpStream::connect(endpoint.authority())
        .await
        .map_err(|e| TransportError::Unreachable(e.to_string()))?;

    if let Err(e) = stream.set_nodelay(true) {
        warn!(addr = %endpoint, "Failed to set TCP_NODELAY: {}", e);
    }

    let mut framed = Framed::new(stream, LinkCodec::new());
    trace!(addr = %endpoint, method = %request.method, path = %request.path, "Sending request");
    framed.send(request).await?;

    match framed.next().await {
        Some(Ok(response)) => {
            trace!(addr = %endpoint, status = response.status, "Received response");
            Ok(response)
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(TransportError::ConnectionLost(
            "closed before a response".to_string(),
        )),
    }
}
