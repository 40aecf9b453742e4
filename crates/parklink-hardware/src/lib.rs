//! Hardware-state model for a parking endpoint.
//!
//! This crate describes the pins an endpoint drives and the state the agent
//! reports back to the controller:
//!
//! - [`traits`]: object-safe pin traits ([`DigitalInput`], [`DigitalOutput`],
//!   [`AnalogInput`], [`PwmOutput`]) and the [`Clock`] tick source.
//! - [`debounce`]: time-based debouncing for the push buttons.
//! - [`types`]: servo pulse widths, the seven-segment table and analog
//!   normalization.
//! - [`board`]: the [`Board`] model that owns the pins and mirrors their state.
//! - [`mock`]: mock pins with control handles for development and tests.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use parklink_hardware::mock::MockBoard;
//!
//! let (mut board, mock) = MockBoard::build(Duration::from_millis(150)).unwrap();
//! board.apply_defaults().unwrap();
//!
//! board.set_display(7).unwrap();
//! board.move_servo(90).unwrap();
//!
//! assert_eq!(board.state().display, 7);
//! assert_eq!(mock.servo.duty(), 4915);
//! ```
//!
//! # Error Handling
//!
//! All pin operations return [`Result<T>`][error::Result] carrying a
//! [`HardwareError`]. The board never panics on a faulted pin; the agent turns
//! the error into a fault reply.

pub mod board;
pub mod clock;
pub mod debounce;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use board::{Board, BoardPins, BoardState};
pub use clock::MonotonicClock;
pub use debounce::Debouncer;
pub use error::{HardwareError, Result};
pub use traits::{AnalogInput, Clock, DigitalInput, DigitalOutput, PwmOutput};
