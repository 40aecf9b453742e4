//! Mock pin implementations for testing and development.
//!
//! This module provides simulated pins that can be controlled
//! programmatically without requiring an endpoint board. [`MockBoard`]
//! wires a complete set of them into a [`crate::board::Board`].

pub mod board;
pub mod clock;
pub mod pins;

// Re-export commonly used types
pub use board::MockBoard;
pub use clock::ManualClock;
pub use pins::{
    MockAnalog, MockAnalogHandle, MockInput, MockInputHandle, MockOutput, MockOutputHandle,
    MockPwm, MockPwmHandle,
};
