//! Typed result of one command.
//!
//! Every path through [`DeviceLink::send_command`](crate::DeviceLink::send_command)
//! yields a fully populated [`CommandOutcome`]: simulated acknowledgements,
//! device replies, HTTP errors and transport failures alike.

use std::fmt;

use parklink_core::constants::{SIMULATED_MESSAGE, STATUS_ERROR, STATUS_OK, STATUS_SIMULATED};
use parklink_protocol::{HttpResponse, Reply};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transport::TransportError;

/// Classification of a command result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Simulated,
    Error,
    Timeout,
    Unreachable,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => STATUS_OK,
            Self::Simulated => STATUS_SIMULATED,
            Self::Error => STATUS_ERROR,
            Self::Timeout => "timeout",
            Self::Unreachable => "unreachable",
        }
    }

    /// `ok` and `simulated` count as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Simulated)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, when something did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkFault {
    /// Request exceeded the configured bound.
    Timeout,
    /// TCP connection could not be established.
    Unreachable,
    /// Peer answered with a non-success status or an error reply.
    Protocol,
    /// Peer answered successfully but the body was not a reply.
    MalformedResponse,
    /// Any other transport failure.
    Transport,
}

/// Result of [`DeviceLink::send_command`](crate::DeviceLink::send_command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub status: OutcomeStatus,
    pub message: Option<String>,
    /// Body as received, when there was one.
    pub raw_body: Option<String>,
    pub http_status: Option<u16>,
    pub fault: Option<LinkFault>,
    /// Extra reply fields (e.g. `servo` after `toggle_aguja`).
    pub extra: Map<String, Value>,
}

impl CommandOutcome {
    fn new(status: OutcomeStatus) -> Self {
        Self {
            status,
            message: None,
            raw_body: None,
            http_status: None,
            fault: None,
            extra: Map::new(),
        }
    }

    /// Acknowledgement for an inactive link.
    pub fn simulated() -> Self {
        Self {
            message: Some(SIMULATED_MESSAGE.to_string()),
            ..Self::new(OutcomeStatus::Simulated)
        }
    }

    /// Interpret a device response.
    ///
    /// A 2xx response whose body is not a reply still counts as `ok`: the
    /// body is kept in `raw_body` and the fault is `MalformedResponse`.
    pub fn from_response(response: &HttpResponse) -> Self {
        let raw = response.body_text();
        let reply = serde_json::from_slice::<Reply>(&response.body).ok();

        let mut outcome = if !response.is_success() {
            Self {
                message: Some(
                    reply
                        .as_ref()
                        .map(|r| r.mensaje.clone())
                        .unwrap_or_else(|| format!("HTTP {}", response.status)),
                ),
                fault: Some(LinkFault::Protocol),
                ..Self::new(OutcomeStatus::Error)
            }
        } else {
            match &reply {
                Some(reply) if reply.status == STATUS_OK => Self {
                    message: Some(reply.mensaje.clone()),
                    ..Self::new(OutcomeStatus::Ok)
                },
                Some(reply) if reply.status == STATUS_SIMULATED => Self {
                    message: Some(reply.mensaje.clone()),
                    ..Self::new(OutcomeStatus::Simulated)
                },
                Some(reply) => Self {
                    message: Some(reply.mensaje.clone()),
                    fault: Some(LinkFault::Protocol),
                    ..Self::new(OutcomeStatus::Error)
                },
                None => Self {
                    fault: Some(LinkFault::MalformedResponse),
                    ..Self::new(OutcomeStatus::Ok)
                },
            }
        };

        if let Some(reply) = reply {
            outcome.extra = reply.extra;
        }
        outcome.http_status = Some(response.status);
        outcome.raw_body = (!raw.is_empty()).then_some(raw);
        outcome
    }

    /// Interpret a transport failure.
    pub fn from_transport_error(error: &TransportError) -> Self {
        let (status, fault) = match error {
            TransportError::Timeout(_) => (OutcomeStatus::Timeout, LinkFault::Timeout),
            TransportError::Unreachable(_) => (OutcomeStatus::Unreachable, LinkFault::Unreachable),
            _ => (OutcomeStatus::Error, LinkFault::Transport),
        };
        Self {
            message: Some(error.to_string()),
            fault: Some(fault),
            ..Self::new(status)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Extra integer field from the reply.
    pub fn extra_i64(&self, name: &str) -> Option<i64> {
        self.extra.get(name).and_then(Value::as_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body.as_bytes().to_vec())
    }

    #[test]
    fn test_simulated() {
        let outcome = CommandOutcome::simulated();
        assert_eq!(outcome.status, OutcomeStatus::Simulated);
        assert_eq!(outcome.message.as_deref(), Some("Modo simulación"));
        assert!(outcome.is_success());
        assert!(outcome.fault.is_none());
    }

    #[test]
    fn test_ok_reply_with_extra() {
        let outcome = CommandOutcome::from_response(&response(
            200,
            r#"{"status":"ok","mensaje":"toggle_aguja","servo":90}"#,
        ));
        assert_eq!(outcome.status, OutcomeStatus::Ok);
        assert_eq!(outcome.message.as_deref(), Some("toggle_aguja"));
        assert_eq!(outcome.extra_i64("servo"), Some(90));
        assert_eq!(outcome.http_status, Some(200));
        assert!(outcome.raw_body.is_some());
    }

    #[test]
    fn test_http_error_is_protocol_fault() {
        let outcome = CommandOutcome::from_response(&response(
            400,
            r#"{"status":"error","mensaje":"accion desconocida"}"#,
        ));
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.fault, Some(LinkFault::Protocol));
        assert_eq!(outcome.http_status, Some(400));
        assert_eq!(outcome.message.as_deref(), Some("accion desconocida"));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_http_error_without_body() {
        let outcome = CommandOutcome::from_response(&response(503, ""));
        assert_eq!(outcome.message.as_deref(), Some("HTTP 503"));
        assert!(outcome.raw_body.is_none());
    }

    #[test]
    fn test_error_status_in_success_response() {
        let outcome =
            CommandOutcome::from_response(&response(200, r#"{"status":"error","mensaje":"x"}"#));
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.fault, Some(LinkFault::Protocol));
    }

    #[test]
    fn test_malformed_success_body() {
        let outcome = CommandOutcome::from_response(&response(200, "OK"));
        assert_eq!(outcome.status, OutcomeStatus::Ok);
        assert_eq!(outcome.fault, Some(LinkFault::MalformedResponse));
        assert_eq!(outcome.raw_body.as_deref(), Some("OK"));
        assert!(outcome.is_success());
    }

    #[test]
    fn test_transport_errors() {
        let timeout = CommandOutcome::from_transport_error(&TransportError::Timeout(2000));
        assert_eq!(timeout.status, OutcomeStatus::Timeout);
        assert_eq!(timeout.fault, Some(LinkFault::Timeout));

        let refused =
            CommandOutcome::from_transport_error(&TransportError::Unreachable("refused".into()));
        assert_eq!(refused.status, OutcomeStatus::Unreachable);

        let lost =
            CommandOutcome::from_transport_error(&TransportError::ConnectionLost("eof".into()));
        assert_eq!(lost.status, OutcomeStatus::Error);
        assert_eq!(lost.fault, Some(LinkFault::Transport));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let value = serde_json::to_value(OutcomeStatus::Unreachable).unwrap();
        assert_eq!(value, json!("unreachable"));
    }
}
