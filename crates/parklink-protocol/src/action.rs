//! Command vocabulary understood by the endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use parklink_core::Error;

/// Action carried in the `accion` field of a command body.
///
/// The wire names are fixed by the deployed firmware and are not translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// `ocupar{espacio}`: show the "occupied" indicator pattern.
    #[serde(rename = "ocupar")]
    Occupy,

    /// `liberar{espacio}`: show the "free" indicator pattern.
    #[serde(rename = "liberar")]
    Release,

    /// `toggle_led{espacio,color}`: flip one indicator.
    #[serde(rename = "toggle_led")]
    ToggleIndicator,

    /// `set_led{index,valor}`: drive one indicator to an explicit level.
    #[serde(rename = "set_led")]
    SetIndicator,

    /// `mover_servo{angulo}`
    #[serde(rename = "mover_servo")]
    MoveActuator,

    /// `mover_servo_boton{angulo}`: same as `mover_servo`, issued from a
    /// physical button reaction.
    #[serde(rename = "mover_servo_boton")]
    MoveActuatorButton,

    /// `toggle_aguja{}`: alternate the barrier between closed and open.
    #[serde(rename = "toggle_aguja")]
    ToggleBarrier,

    /// `actualizar_display{numero}`
    #[serde(rename = "actualizar_display")]
    UpdateDisplay,
}

impl Action {
    /// Every action, in wire-table order.
    pub const ALL: [Action; 8] = [
        Action::Occupy,
        Action::Release,
        Action::ToggleIndicator,
        Action::SetIndicator,
        Action::MoveActuator,
        Action::MoveActuatorButton,
        Action::ToggleBarrier,
        Action::UpdateDisplay,
    ];

    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Occupy => "ocupar",
            Action::Release => "liberar",
            Action::ToggleIndicator => "toggle_led",
            Action::SetIndicator => "set_led",
            Action::MoveActuator => "mover_servo",
            Action::MoveActuatorButton => "mover_servo_boton",
            Action::ToggleBarrier => "toggle_aguja",
            Action::UpdateDisplay => "actualizar_display",
        }
    }

    /// Parameter names the action reads from the command body.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Action::Occupy | Action::Release => &["espacio"],
            Action::ToggleIndicator => &["espacio", "color"],
            Action::SetIndicator => &["index", "valor"],
            Action::MoveActuator | Action::MoveActuatorButton => &["angulo"],
            Action::ToggleBarrier => &[],
            Action::UpdateDisplay => &["numero"],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}
