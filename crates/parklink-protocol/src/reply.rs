//! Acknowledgement bodies returned by `POST /comando`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use parklink_core::constants::{STATUS_ERROR, STATUS_OK};

/// Body of a `POST /comando` response (and of every error response).
///
/// ```text
/// {"status": "ok", "mensaje": "servo 90"}
/// {"status": "ok", "mensaje": "toggle_aguja", "servo": 90}
/// {"status": "error", "mensaje": "accion desconocida"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: String,

    #[serde(default)]
    pub mensaje: String,

    /// Action-specific fields returned next to `status`/`mensaje`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            mensaje: message.into(),
            extra: Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            mensaje: message.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_flattens_extra() {
        let reply = Reply::ok("toggle_aguja").with_extra("servo", 90);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"status": "ok", "mensaje": "toggle_aguja", "servo": 90})
        );
    }

    #[test]
    fn test_reply_parse() {
        let reply: Reply =
            serde_json::from_str(r#"{"status":"error","mensaje":"accion desconocida"}"#).unwrap();
        assert!(!reply.is_ok());
        assert_eq!(reply.mensaje, "accion desconocida");
        assert!(reply.extra.is_empty());
    }

    #[test]
    fn test_reply_missing_message() {
        let reply: Reply = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.mensaje, "");
    }
}
