//! Request dispatch for the endpoint agent.
//!
//! [`DeviceAgent`] owns the [`Board`] and answers the two protocol routes:
//!
//! | route | reply |
//! |-------|-------|
//! | `GET /estado` | 200 + [`StatusSnapshot`] |
//! | `POST /comando` | 200 + `{"status":"ok",...}`, or 400/500 + `{"status":"error",...}` |
//! | anything else | 404 |
//!
//! Every failure is turned into a response here, so nothing a peer sends can
//! stop the serving loop.

use parklink_core::constants::{ROUTE_COMMAND, ROUTE_STATUS};
use parklink_hardware::{Board, BoardState, HardwareError};
use parklink_protocol::{Action, Command, HttpRequest, HttpResponse, Method, Reply, StatusSnapshot};
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a request could not be served.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Command body absent, empty or not a JSON object.
    #[error("JSON faltante")]
    MissingBody,

    /// Action name outside the vocabulary.
    #[error("accion desconocida")]
    UnknownAction(String),

    /// No route for this method and path.
    #[error("ruta no encontrada")]
    RouteNotFound,

    /// A parameter could not be read.
    #[error("{0}")]
    InvalidParameter(#[from] parklink_core::Error),

    /// A pin failed while executing a known action.
    #[error("{0}")]
    Hardware(#[from] HardwareError),
}

impl DispatchError {
    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingBody | Self::UnknownAction(_) => 400,
            Self::RouteNotFound => 404,
            Self::InvalidParameter(_) | Self::Hardware(_) => 500,
        }
    }

    /// Error reply carrying this failure's message.
    pub fn to_response(&self) -> HttpResponse {
        error_response(self.status_code(), &self.to_string())
    }
}

/// Build a JSON error reply.
pub fn error_response(status: u16, message: &str) -> HttpResponse {
    json_response(status, &Reply::error(message))
}

fn json_response<T: serde::Serialize>(status: u16, body: &T) -> HttpResponse {
    match HttpResponse::json(status, body) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Failed to serialize reply");
            HttpResponse::new(500, Vec::new())
        }
    }
}

/// Convert the board mirror into the wire snapshot.
pub fn snapshot_of(state: &BoardState) -> StatusSnapshot {
    StatusSnapshot {
        btn1: u8::from(state.entry),
        btn2: u8::from(state.exit),
        ldr: state.light,
        leds: state.indicators.iter().map(|&on| u8::from(on)).collect(),
        servo: state.servo,
        display: state.display,
    }
}

/// Endpoint request handler and hardware-state owner.
#[derive(Debug)]
pub struct DeviceAgent {
    board: Board,
}

impl DeviceAgent {
    /// Take ownership of a board and drive its boot defaults onto the pins.
    pub fn new(mut board: Board) -> Result<Self, HardwareError> {
        board.apply_defaults()?;
        Ok(Self { board })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Sample the debounced inputs without answering anything.
    pub fn sample_inputs(&mut self) -> Result<bool, HardwareError> {
        self.board.sample_inputs()
    }

    /// Fresh snapshot: inputs and light sensor are sampled first.
    pub fn snapshot(&mut self) -> Result<StatusSnapshot, HardwareError> {
        self.board.sample_inputs()?;
        self.board.read_analog()?;
        Ok(snapshot_of(self.board.state()))
    }

    /// Answer one request.
    pub fn handle(&mut self, request: &HttpRequest) -> HttpResponse {
        debug!(method = %request.method, path = %request.path, "Dispatching request");

        let result = match (&request.method, request.path.as_str()) {
            (Method::Get, ROUTE_STATUS) => self
                .snapshot()
                .map(|snapshot| json_response(200, &snapshot))
                .map_err(DispatchError::from),
            (Method::Post, ROUTE_COMMAND) => self
                .command_body(&request.body)
                .and_then(|command| self.execute(&command))
                .map(|reply| json_response(200, &reply)),
            _ => Err(DispatchError::RouteNotFound),
        };

        result.unwrap_or_else(|e| {
            match &e {
                DispatchError::Hardware(_) | DispatchError::InvalidParameter(_) => {
                    warn!(path = %request.path, error = %e, "Command failed")
                }
                _ => debug!(path = %request.path, error = %e, "Request rejected"),
            }
            e.to_response()
        })
    }

    fn command_body(&self, body: &[u8]) -> Result<Command, DispatchError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(DispatchError::MissingBody);
        }
        let command = Command::parse(body).map_err(|_| DispatchError::MissingBody)?;
        if command.action().is_empty() && command.params().is_empty() {
            return Err(DispatchError::MissingBody);
        }
        Ok(command)
    }

    /// Apply one command to the board.
    pub fn execute(&mut self, command: &Command) -> Result<Reply, DispatchError> {
        let action = command
            .kind()
            .map_err(|_| DispatchError::UnknownAction(command.action().to_string()))?;
        debug!(%action, "Executing command");

        let reply = match action {
            Action::Occupy => {
                let space = command.int_param_or("espacio", 0)?;
                self.board.show_occupied()?;
                Reply::ok(format!("ocupado {space}"))
            }
            Action::Release => {
                let space = command.int_param_or("espacio", 0)?;
                self.board.show_free()?;
                Reply::ok(format!("liberado {space}"))
            }
            Action::ToggleIndicator => {
                let index = command.int_param_or("espacio", 0)?;
                self.board.toggle_indicator(index)?;
                Reply::ok(action.as_str())
            }
            Action::SetIndicator => {
                let index = command.int_param_or("index", 0)?;
                let value = command.int_param_or("valor", 0)?;
                self.board.set_indicator(index, value != 0)?;
                Reply::ok(action.as_str())
            }
            Action::MoveActuator | Action::MoveActuatorButton => {
                let angle = command.int_param_or("angulo", 0)?;
                let applied = self.board.move_servo(angle)?;
                Reply::ok(format!("servo {applied}"))
            }
            Action::ToggleBarrier => {
                let angle = self.board.toggle_barrier()?;
                Reply::ok(action.as_str()).with_extra("servo", angle)
            }
            Action::UpdateDisplay => {
                let number = command.int_param_or("numero", 0)?;
                self.board.set_display(number)?;
                Reply::ok("display actualizado")
            }
        };
        Ok(reply)
    }
}
