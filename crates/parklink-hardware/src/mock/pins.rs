//! Mock pins for testing and development.
//!
//! Each mock comes paired with a handle sharing its state, so a test (or the
//! development binary) can press buttons, read LED levels or make a pin fail
//! while the board owns the pin itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use crate::{
    HardwareError, Result,
    traits::{AnalogInput, DigitalInput, DigitalOutput, PwmOutput},
};

#[derive(Debug, Default)]
struct Shared {
    fault: AtomicBool,
}

impl Shared {
    fn check(&self, pin: &str) -> Result<()> {
        if self.fault.load(Ordering::SeqCst) {
            return Err(HardwareError::pin_fault(pin, "injected fault"));
        }
        Ok(())
    }
}

/// Mock digital input.
///
/// ```
/// use parklink_hardware::mock::MockInput;
/// use parklink_hardware::traits::DigitalInput;
///
/// let (mut button, handle) = MockInput::new("GP14");
/// assert!(!button.is_high().unwrap());
/// handle.press();
/// assert!(button.is_high().unwrap());
/// ```
#[derive(Debug)]
pub struct MockInput {
    name: String,
    level: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl MockInput {
    pub fn new(name: impl Into<String>) -> (Self, MockInputHandle) {
        let level = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(Shared::default());
        let input = Self {
            name: name.into(),
            level: Arc::clone(&level),
            shared: Arc::clone(&shared),
        };
        (input, MockInputHandle { level, shared })
    }
}

impl DigitalInput for MockInput {
    fn is_high(&mut self) -> Result<bool> {
        self.shared.check(&self.name)?;
        Ok(self.level.load(Ordering::SeqCst))
    }
}

/// Handle for driving a [`MockInput`].
#[derive(Debug, Clone)]
pub struct MockInputHandle {
    level: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl MockInputHandle {
    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }

    pub fn press(&self) {
        self.set_level(true);
    }

    pub fn release(&self) {
        self.set_level(false);
    }

    /// Make every subsequent read fail.
    pub fn set_fault(&self, fault: bool) {
        self.shared.fault.store(fault, Ordering::SeqCst);
    }
}

/// Mock digital output.
#[derive(Debug)]
pub struct MockOutput {
    name: String,
    level: Arc<AtomicBool>,
    writes: Arc<AtomicU32>,
    shared: Arc<Shared>,
}

impl MockOutput {
    pub fn new(name: impl Into<String>) -> (Self, MockOutputHandle) {
        let level = Arc::new(AtomicBool::new(false));
        let writes = Arc::new(AtomicU32::new(0));
        let shared = Arc::new(Shared::default());
        let output = Self {
            name: name.into(),
            level: Arc::clone(&level),
            writes: Arc::clone(&writes),
            shared: Arc::clone(&shared),
        };
        (
            output,
            MockOutputHandle {
                level,
                writes,
                shared,
            },
        )
    }
}

impl DigitalOutput for MockOutput {
    fn set_level(&mut self, high: bool) -> Result<()> {
        self.shared.check(&self.name)?;
        self.level.store(high, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle for observing a [`MockOutput`].
#[derive(Debug, Clone)]
pub struct MockOutputHandle {
    level: Arc<AtomicBool>,
    writes: Arc<AtomicU32>,
    shared: Arc<Shared>,
}

impl MockOutputHandle {
    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail.
    pub fn set_fault(&self, fault: bool) {
        self.shared.fault.store(fault, Ordering::SeqCst);
    }
}

/// Mock 16-bit analog input.
#[derive(Debug)]
pub struct MockAnalog {
    name: String,
    raw: Arc<AtomicU16>,
    shared: Arc<Shared>,
}

impl MockAnalog {
    pub fn new(name: impl Into<String>) -> (Self, MockAnalogHandle) {
        let raw = Arc::new(AtomicU16::new(0));
        let shared = Arc::new(Shared::default());
        let analog = Self {
            name: name.into(),
            raw: Arc::clone(&raw),
            shared: Arc::clone(&shared),
        };
        (analog, MockAnalogHandle { raw, shared })
    }
}

impl AnalogInput for MockAnalog {
    fn read_u16(&mut self) -> Result<u16> {
        self.shared.check(&self.name)?;
        Ok(self.raw.load(Ordering::SeqCst))
    }
}

/// Handle for setting a [`MockAnalog`] reading.
#[derive(Debug, Clone)]
pub struct MockAnalogHandle {
    raw: Arc<AtomicU16>,
    shared: Arc<Shared>,
}

impl MockAnalogHandle {
    pub fn set_raw(&self, raw: u16) {
        self.raw.store(raw, Ordering::SeqCst);
    }

    pub fn set_fault(&self, fault: bool) {
        self.shared.fault.store(fault, Ordering::SeqCst);
    }
}

/// Mock PWM output.
#[derive(Debug)]
pub struct MockPwm {
    name: String,
    frequency: Arc<AtomicU32>,
    duty: Arc<AtomicU16>,
    shared: Arc<Shared>,
}

impl MockPwm {
    pub fn new(name: impl Into<String>) -> (Self, MockPwmHandle) {
        let frequency = Arc::new(AtomicU32::new(0));
        let duty = Arc::new(AtomicU16::new(0));
        let shared = Arc::new(Shared::default());
        let pwm = Self {
            name: name.into(),
            frequency: Arc::clone(&frequency),
            duty: Arc::clone(&duty),
            shared: Arc::clone(&shared),
        };
        (
            pwm,
            MockPwmHandle {
                frequency,
                duty,
                shared,
            },
        )
    }
}

impl PwmOutput for MockPwm {
    fn set_frequency(&mut self, hz: u32) -> Result<()> {
        self.shared.check(&self.name)?;
        self.frequency.store(hz, Ordering::SeqCst);
        Ok(())
    }

    fn set_duty_u16(&mut self, duty: u16) -> Result<()> {
        self.shared.check(&self.name)?;
        self.duty.store(duty, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle for observing a [`MockPwm`].
#[derive(Debug, Clone)]
pub struct MockPwmHandle {
    frequency: Arc<AtomicU32>,
    duty: Arc<AtomicU16>,
    shared: Arc<Shared>,
}

impl MockPwmHandle {
    pub fn frequency(&self) -> u32 {
        self.frequency.load(Ordering::SeqCst)
    }

    pub fn duty(&self) -> u16 {
        self.duty.load(Ordering::SeqCst)
    }

    pub fn set_fault(&self, fault: bool) {
        self.shared.fault.store(fault, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_handle_drives_level() {
        let (mut input, handle) = MockInput::new("btn");
        handle.press();
        assert!(input.is_high().unwrap());
        handle.release();
        assert!(!input.is_high().unwrap());
    }

    #[test]
    fn test_output_counts_writes() {
        let (mut led, handle) = MockOutput::new("led");
        led.set_level(true).unwrap();
        led.set_level(false).unwrap();
        assert!(!handle.level());
        assert_eq!(handle.writes(), 2);
    }

    #[test]
    fn test_output_fault() {
        let (mut led, handle) = MockOutput::new("GP2");
        handle.set_fault(true);
        let err = led.set_level(true).unwrap_err();
        assert!(matches!(err, HardwareError::PinFault { .. }));
        assert_eq!(handle.writes(), 0);

        handle.set_fault(false);
        assert!(led.set_level(true).is_ok());
    }

    #[test]
    fn test_analog_reading() {
        let (mut ldr, handle) = MockAnalog::new("ADC0");
        handle.set_raw(40000);
        assert_eq!(ldr.read_u16().unwrap(), 40000);
        handle.set_fault(true);
        assert!(ldr.read_u16().is_err());
    }

    #[test]
    fn test_pwm_state() {
        let (mut servo, handle) = MockPwm::new("GP16");
        servo.set_frequency(50).unwrap();
        servo.set_duty_u16(4915).unwrap();
        assert_eq!(handle.frequency(), 50);
        assert_eq!(handle.duty(), 4915);
    }
}
