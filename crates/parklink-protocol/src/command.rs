//! Command payload sent to `POST /comando`.
//!
//! On the wire a command is a flat JSON object: the action name under
//! `accion` and the action's parameters alongside it.
//!
//! ```
//! use parklink_protocol::{Action, Command};
//!
//! let cmd = Command::move_actuator(90);
//! assert_eq!(cmd.action(), "mover_servo");
//! assert_eq!(cmd.to_json().to_string(), r#"{"accion":"mover_servo","angulo":90}"#);
//!
//! let parsed = Command::parse(br#"{"accion":"actualizar_display","numero":"7"}"#).unwrap();
//! assert_eq!(parsed.kind().unwrap(), Action::UpdateDisplay);
//! assert_eq!(parsed.int_param_or("numero", 0).unwrap(), 7);
//! ```

use serde_json::{Map, Value};

use crate::Action;
use parklink_core::{Error, Result};

/// Key holding the action name.
pub const ACTION_KEY: &str = "accion";

/// An action name plus its named parameters.
///
/// The action is kept as a string so that names outside the vocabulary can
/// still be carried to the device, which answers them with an error reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    action: String,
    params: Map<String, Value>,
}

impl Command {
    /// Create a command for a known action with no parameters.
    pub fn new(action: Action) -> Self {
        Self::named(action.as_str())
    }

    /// Create a command with an arbitrary action name.
    pub fn named(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn occupy(space: u32) -> Self {
        Self::new(Action::Occupy).param("espacio", space)
    }

    pub fn release(space: u32) -> Self {
        Self::new(Action::Release).param("espacio", space)
    }

    pub fn toggle_indicator(space: u32, color: &str) -> Self {
        Self::new(Action::ToggleIndicator)
            .param("espacio", space)
            .param("color", color)
    }

    pub fn set_indicator(index: u32, on: bool) -> Self {
        Self::new(Action::SetIndicator)
            .param("index", index)
            .param("valor", u8::from(on))
    }

    pub fn move_actuator(angle: u16) -> Self {
        Self::new(Action::MoveActuator).param("angulo", angle)
    }

    pub fn move_actuator_button(angle: u16) -> Self {
        Self::new(Action::MoveActuatorButton).param("angulo", angle)
    }

    pub fn toggle_barrier() -> Self {
        Self::new(Action::ToggleBarrier)
    }

    pub fn update_display(digit: u32) -> Self {
        Self::new(Action::UpdateDisplay).param("numero", digit)
    }

    /// Raw action name.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Resolve the action name against the vocabulary.
    ///
    /// # Errors
    /// Returns `Error::UnknownAction` for names outside the vocabulary.
    pub fn kind(&self) -> Result<Action> {
        self.action.parse()
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Read an integer parameter.
    ///
    /// Accepts JSON numbers (floats are truncated) and numeric strings.
    /// Returns `Ok(None)` when the parameter is absent or null.
    ///
    /// # Errors
    /// Returns `Error::InvalidField` when the value cannot be read as an
    /// integer.
    pub fn int_param(&self, name: &str) -> Result<Option<i64>> {
        match self.params.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(Some)
                .ok_or_else(|| Error::invalid_field(name, format!("not an integer: {n}"))),
            Some(Value::Bool(b)) => Ok(Some(i64::from(*b))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| Error::invalid_field(name, format!("not an integer: {s:?}"))),
            Some(other) => Err(Error::invalid_field(
                name,
                format!("not an integer: {other}"),
            )),
        }
    }

    /// Read an integer parameter, falling back to `default` when absent.
    pub fn int_param_or(&self, name: &str, default: i64) -> Result<i64> {
        Ok(self.int_param(name)?.unwrap_or(default))
    }

    /// Read a string parameter.
    pub fn str_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Parse a command from a request body.
    ///
    /// A missing `accion` key yields an empty action name, which resolves
    /// to `Error::UnknownAction` later in [`Command::kind`].
    ///
    /// # Errors
    /// Returns `Error::InvalidJson` if the body is not a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| Error::InvalidJson(e.to_string()))?;
        Self::from_json(value)
    }

    /// Build a command from an already decoded JSON value.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut params) = value else {
            return Err(Error::InvalidJson("expected a JSON object".to_string()));
        };

        let action = match params.remove(ACTION_KEY) {
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(Error::invalid_field(
                    ACTION_KEY,
                    format!("expected a string, got {other}"),
                ));
            }
            None => String::new(),
        };

        Ok(Self { action, params })
    }

    /// Serialize into the flat wire object.
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.params.len() + 1);
        object.insert(ACTION_KEY.to_string(), Value::String(self.action.clone()));
        for (k, v) in &self.params {
            object.insert(k.clone(), v.clone());
        }
        Value::Object(object)
    }

    /// Serialize into body bytes.
    pub fn to_body(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        Command::new(action)
    }
}
