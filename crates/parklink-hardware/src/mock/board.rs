use std::sync::Arc;
use std::time::Duration;

use parklink_core::constants::{INDICATOR_COUNT, SEGMENT_COUNT};

use super::{
    ManualClock, MockAnalog, MockAnalogHandle, MockInput, MockInputHandle, MockOutput,
    MockOutputHandle, MockPwm, MockPwmHandle,
};
use crate::{
    Result,
    board::{Board, BoardPins},
    traits::{Clock, DigitalOutput},
};

const SEGMENT_NAMES: [&str; SEGMENT_COUNT] = ["GP4", "GP5", "GP6", "GP7", "GP8", "GP9", "GP10"];

/// Control handles for a fully mocked [`Board`].
///
/// ```
/// use std::time::Duration;
/// use parklink_hardware::mock::MockBoard;
///
/// let (mut board, mock) = MockBoard::build(Duration::from_millis(150)).unwrap();
/// board.apply_defaults().unwrap();
///
/// mock.entry.press();
/// board.sample_inputs().unwrap();
/// assert!(board.state().entry);
/// ```
#[derive(Debug, Clone)]
pub struct MockBoard {
    pub entry: MockInputHandle,
    pub exit: MockInputHandle,
    pub light: MockAnalogHandle,
    pub indicators: Vec<MockOutputHandle>,
    pub servo: MockPwmHandle,
    pub segments: Vec<MockOutputHandle>,
    /// Clock used by [`MockBoard::build`]; untouched by boards built with
    /// another clock.
    pub clock: ManualClock,
}

impl MockBoard {
    /// Mock pins wired like an endpoint, with their handles.
    pub fn pins() -> (BoardPins, Self) {
        let (entry_button, entry) = MockInput::new("GP14");
        let (exit_button, exit) = MockInput::new("GP15");
        let (light_sensor, light) = MockAnalog::new("ADC0");
        let (servo_pin, servo) = MockPwm::new("GP16");

        let mut indicator_pins: Vec<Box<dyn DigitalOutput>> = Vec::with_capacity(INDICATOR_COUNT);
        let mut indicators = Vec::with_capacity(INDICATOR_COUNT);
        for name in ["GP2", "GP3"] {
            let (pin, handle) = MockOutput::new(name);
            indicator_pins.push(Box::new(pin));
            indicators.push(handle);
        }

        let mut segment_pins: Vec<Box<dyn DigitalOutput>> = Vec::with_capacity(SEGMENT_COUNT);
        let mut segments = Vec::with_capacity(SEGMENT_COUNT);
        for name in SEGMENT_NAMES {
            let (pin, handle) = MockOutput::new(name);
            segment_pins.push(Box::new(pin));
            segments.push(handle);
        }

        let pins = BoardPins {
            entry_button: Box::new(entry_button),
            exit_button: Box::new(exit_button),
            light_sensor: Box::new(light_sensor),
            indicators: indicator_pins,
            servo: Box::new(servo_pin),
            segments: segment_pins,
        };
        let mock = Self {
            entry,
            exit,
            light,
            indicators,
            servo,
            segments,
            clock: ManualClock::new(0),
        };
        (pins, mock)
    }

    /// A mocked board driven by the handle's [`ManualClock`].
    pub fn build(debounce: Duration) -> Result<(Board, Self)> {
        let (pins, mock) = Self::pins();
        let board = Board::new(pins, Arc::new(mock.clock.clone()), debounce)?;
        Ok((board, mock))
    }

    /// A mocked board driven by an arbitrary clock.
    pub fn build_with_clock(debounce: Duration, clock: Arc<dyn Clock>) -> Result<(Board, Self)> {
        let (pins, mock) = Self::pins();
        let board = Board::new(pins, clock, debounce)?;
        Ok((board, mock))
    }

    /// Current segment levels a..g.
    pub fn segment_levels(&self) -> [bool; SEGMENT_COUNT] {
        std::array::from_fn(|i| self.segments[i].level())
    }
}
