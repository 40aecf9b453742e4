//! Protocol and hardware constants shared by the controller and the agent.
//!
//! The controller talks to each parking endpoint over a tiny HTTP/1.1 dialect:
//!
//! ```text
//! GET  /estado   -> 200 {"btn1":0,"btn2":0,"ldr":512,"leds":[0,1],"servo":0,"display":2}
//! POST /comando  {"accion":"ocupar","espacio":0}
//!                -> 200 {"status":"ok","mensaje":"ocupado 0"}
//! ```
//!
//! Every exchange is a single request on a fresh connection, closed after the
//! response.
//!
//! # Usage
//!
//! ```
//! use parklink_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(ROUTE_STATUS, "/estado");
//! let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
//! assert_eq!(timeout.as_secs(), 2);
//! ```

// ============================================================================
// Routes
// ============================================================================

/// Status query route (`GET`).
pub const ROUTE_STATUS: &str = "/estado";

/// Command execution route (`POST`).
pub const ROUTE_COMMAND: &str = "/comando";

// ============================================================================
// Reply Status Values
// ============================================================================

/// `status` field of a successful reply.
pub const STATUS_OK: &str = "ok";

/// `status` field of a failed reply.
pub const STATUS_ERROR: &str = "error";

/// Status reported by an inactive link instead of contacting the device.
pub const STATUS_SIMULATED: &str = "simulated";

/// Message attached to simulated results.
pub const SIMULATED_MESSAGE: &str = "Modo simulación";

// ============================================================================
// Network Defaults
// ============================================================================

/// Default agent port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 2;

/// Timeout used by connection checks, in milliseconds.
///
/// Checks are cheaper than commands and use a tighter bound than the
/// per-request timeout.
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 1000;

/// Pause between consecutive activations in a pool, in milliseconds.
pub const DEFAULT_ACTIVATION_PAUSE_MS: u64 = 200;

/// Maximum accepted HTTP message size (head + body).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

// ============================================================================
// Inputs
// ============================================================================

/// Minimum time between two accepted level changes of a digital input.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Period of the agent's background input sampling.
pub const DEFAULT_SAMPLE_PERIOD_MS: u64 = 20;

/// Full scale of a raw 16-bit ADC reading.
pub const ADC_RAW_MAX: u32 = 65535;

/// Full scale of the normalized analog reading reported in snapshots.
pub const ANALOG_NORMALIZED_MAX: u32 = 1023;

// ============================================================================
// Actuator
// ============================================================================

/// Servo PWM frequency in Hz.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;

/// Servo PWM period in milliseconds (1 / 50 Hz).
pub const SERVO_PERIOD_MS: f64 = 20.0;

/// Pulse width at 0 degrees.
pub const SERVO_MIN_PULSE_MS: f64 = 0.5;

/// Pulse width at [`SERVO_MAX_ANGLE`] degrees.
pub const SERVO_MAX_PULSE_MS: f64 = 2.5;

/// Largest servo angle in degrees.
pub const SERVO_MAX_ANGLE: u16 = 180;

/// Barrier angle when closed.
pub const BARRIER_CLOSED_ANGLE: u16 = 0;

/// Barrier angle when open.
pub const BARRIER_OPEN_ANGLE: u16 = 90;

// ============================================================================
// Indicators and Display
// ============================================================================

/// Index of the red ("occupied") indicator.
pub const INDICATOR_OCCUPIED: usize = 0;

/// Index of the green ("free") indicator.
pub const INDICATOR_FREE: usize = 1;

/// Number of indicator outputs on an endpoint.
pub const INDICATOR_COUNT: usize = 2;

/// Digit shown on the display after boot.
pub const DEFAULT_DISPLAY_DIGIT: u8 = 2;

/// Number of segments driven by the display (a..g).
pub const SEGMENT_COUNT: usize = 7;
