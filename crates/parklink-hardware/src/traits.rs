//! Pin trait definitions.
//!
//! These traits are the contract between the board model and whatever
//! actually drives the pins: GPIO on an endpoint, or the mocks in
//! [`crate::mock`] during development and tests.
//!
//! Pin operations complete immediately on real hardware, so the traits are
//! synchronous and object-safe; the board holds them as `Box<dyn Trait>`.
//!
//! # Examples
//!
//! ```
//! use parklink_hardware::traits::DigitalOutput;
//! use parklink_hardware::mock::MockOutput;
//!
//! let (mut led, handle) = MockOutput::new("GP2");
//! led.set_level(true).unwrap();
//! assert!(handle.level());
//! ```

use crate::error::Result;

/// A digital input pin (button, switch).
pub trait DigitalInput: Send {
    /// Sample the raw, undebounced level.
    fn is_high(&mut self) -> Result<bool>;
}

/// A digital output pin (indicator LED, display segment).
pub trait DigitalOutput: Send {
    /// Drive the pin high or low.
    fn set_level(&mut self, high: bool) -> Result<()>;
}

/// An analog input sampled as a 16-bit value.
pub trait AnalogInput: Send {
    /// Read the raw value, full scale 0..=65535.
    fn read_u16(&mut self) -> Result<u16>;
}

/// A PWM output driving an actuator.
pub trait PwmOutput: Send {
    /// Set the PWM frequency in Hz.
    fn set_frequency(&mut self, hz: u32) -> Result<()>;

    /// Set the duty cycle, full scale 0..=65535.
    fn set_duty_u16(&mut self, duty: u16) -> Result<()>;
}

/// A monotonic millisecond tick source.
///
/// Debouncing only compares ticks, so any monotonic origin works.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}
