//! Error types for hardware operations.
//!
//! Pin-level failures surface here. The agent turns every one of them into a
//! runtime-fault reply, so the message text ends up in front of the
//! controller.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving or sampling pins.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// An addressed output or value is outside its valid range.
    #[error("{what} out of range: {value}")]
    OutOfRange { what: String, value: i64 },

    /// A pin rejected a write or read.
    #[error("Pin fault on {pin}: {message}")]
    PinFault { pin: String, message: String },

    /// Board wiring does not match what the model expects.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl HardwareError {
    /// Create a new out-of-range error.
    pub fn out_of_range(what: impl Into<String>, value: i64) -> Self {
        Self::OutOfRange {
            what: what.into(),
            value,
        }
    }

    /// Create a new pin fault error.
    pub fn pin_fault(pin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PinFault {
            pin: pin.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
