//! The endpoint's hardware-state model.
//!
//! [`Board`] owns every pin of a parking endpoint: two push buttons (entry and
//! exit), a light sensor, the indicator LEDs, the barrier servo and a
//! seven-segment display. It mirrors what it last drove onto the outputs in a
//! [`BoardState`], which is what status queries report.
//!
//! Outputs are only recorded in the state after the pin accepted the write,
//! so a faulted pin never leaves the mirror claiming a level it does not have.

use std::sync::Arc;
use std::time::Duration;

use parklink_core::constants::{
    BARRIER_CLOSED_ANGLE, BARRIER_OPEN_ANGLE, DEFAULT_DISPLAY_DIGIT, INDICATOR_COUNT,
    INDICATOR_FREE, INDICATOR_OCCUPIED, SEGMENT_COUNT, SERVO_PWM_FREQ_HZ,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    HardwareError, Result,
    debounce::Debouncer,
    traits::{AnalogInput, Clock, DigitalInput, DigitalOutput, PwmOutput},
    types::{clamp_angle, display_digit, normalize_analog, segment_pattern, servo_duty_u16},
};

/// The pins a [`Board`] drives.
pub struct BoardPins {
    pub entry_button: Box<dyn DigitalInput>,
    pub exit_button: Box<dyn DigitalInput>,
    pub light_sensor: Box<dyn AnalogInput>,
    /// Indicator LEDs, index-addressed. Index 0 is "occupied", 1 is "free".
    pub indicators: Vec<Box<dyn DigitalOutput>>,
    pub servo: Box<dyn PwmOutput>,
    /// Display segments a..g.
    pub segments: Vec<Box<dyn DigitalOutput>>,
}

/// Mirror of the board's inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    /// Debounced entry button level.
    pub entry: bool,
    /// Debounced exit button level.
    pub exit: bool,
    /// Light sensor reading, normalized.
    pub light: u16,
    pub indicators: Vec<bool>,
    /// Servo angle in degrees.
    pub servo: u16,
    pub display: u8,
}

impl BoardState {
    fn boot(indicator_count: usize) -> Self {
        Self {
            entry: false,
            exit: false,
            light: 0,
            indicators: vec![false; indicator_count],
            servo: BARRIER_CLOSED_ANGLE,
            display: DEFAULT_DISPLAY_DIGIT,
        }
    }
}

/// Hardware-state model for one endpoint.
pub struct Board {
    pins: BoardPins,
    clock: Arc<dyn Clock>,
    entry: Debouncer,
    exit: Debouncer,
    state: BoardState,
}

impl Board {
    /// Wrap a set of pins.
    ///
    /// Fails if the display does not have exactly seven segments or there are
    /// fewer indicators than the occupied/free pair needs. Nothing is driven
    /// until [`Board::apply_defaults`].
    pub fn new(pins: BoardPins, clock: Arc<dyn Clock>, debounce: Duration) -> Result<Self> {
        if pins.segments.len() != SEGMENT_COUNT {
            return Err(HardwareError::configuration(format!(
                "expected {} segment pins, got {}",
                SEGMENT_COUNT,
                pins.segments.len()
            )));
        }
        if pins.indicators.len() < INDICATOR_COUNT {
            return Err(HardwareError::configuration(format!(
                "expected at least {} indicator pins, got {}",
                INDICATOR_COUNT,
                pins.indicators.len()
            )));
        }

        let state = BoardState::boot(pins.indicators.len());
        Ok(Self {
            pins,
            clock,
            entry: Debouncer::with_window(debounce),
            exit: Debouncer::with_window(debounce),
            state,
        })
    }

    /// Drive the boot state: indicators showing "free", the default display
    /// digit and the barrier closed.
    pub fn apply_defaults(&mut self) -> Result<()> {
        self.pins.servo.set_frequency(SERVO_PWM_FREQ_HZ)?;
        for index in 0..self.pins.indicators.len() {
            self.write_indicator(index, false)?;
        }
        self.show_free()?;
        self.set_display(i64::from(DEFAULT_DISPLAY_DIGIT))?;
        self.move_servo(i64::from(BARRIER_CLOSED_ANGLE))?;
        debug!(state = ?self.state, "Board defaults applied");
        Ok(())
    }

    /// Sample both buttons through their debouncers.
    ///
    /// Returns `true` if either accepted level changed.
    pub fn sample_inputs(&mut self) -> Result<bool> {
        let now = self.clock.now_ms();
        let entry_raw = self.pins.entry_button.is_high()?;
        let exit_raw = self.pins.exit_button.is_high()?;

        let entry_changed = self.entry.update(entry_raw, now);
        let exit_changed = self.exit.update(exit_raw, now);
        self.state.entry = self.entry.level();
        self.state.exit = self.exit.level();

        if entry_changed || exit_changed {
            trace!(
                entry = self.state.entry,
                exit = self.state.exit,
                now_ms = now,
                "Input level accepted"
            );
        }
        Ok(entry_changed || exit_changed)
    }

    /// Read and normalize the light sensor.
    pub fn read_analog(&mut self) -> Result<u16> {
        let raw = self.pins.light_sensor.read_u16()?;
        self.state.light = normalize_analog(raw);
        Ok(self.state.light)
    }

    /// Drive one indicator to an explicit level.
    pub fn set_indicator(&mut self, index: i64, on: bool) -> Result<()> {
        let index = self.indicator_index(index)?;
        self.write_indicator(index, on)
    }

    /// Flip one indicator, returning its new level.
    pub fn toggle_indicator(&mut self, index: i64) -> Result<bool> {
        let index = self.indicator_index(index)?;
        let level = !self.state.indicators[index];
        self.write_indicator(index, level)?;
        Ok(level)
    }

    /// Show the "occupied" pattern: occupied on, free off.
    pub fn show_occupied(&mut self) -> Result<()> {
        self.write_indicator(INDICATOR_FREE, false)?;
        self.write_indicator(INDICATOR_OCCUPIED, true)
    }

    /// Show the "free" pattern: occupied off, free on.
    pub fn show_free(&mut self) -> Result<()> {
        self.write_indicator(INDICATOR_OCCUPIED, false)?;
        self.write_indicator(INDICATOR_FREE, true)
    }

    /// Move the servo, clamping the angle to its travel. Returns the angle
    /// actually applied.
    pub fn move_servo(&mut self, angle: i64) -> Result<u16> {
        let angle = clamp_angle(angle);
        let duty = servo_duty_u16(angle);
        self.pins.servo.set_duty_u16(duty)?;
        self.state.servo = angle;
        debug!(angle, duty, "Servo moved");
        Ok(angle)
    }

    /// Open a closed barrier, close anything else.
    pub fn toggle_barrier(&mut self) -> Result<u16> {
        let target = if self.state.servo == BARRIER_CLOSED_ANGLE {
            BARRIER_OPEN_ANGLE
        } else {
            BARRIER_CLOSED_ANGLE
        };
        self.move_servo(i64::from(target))
    }

    /// Show `n` modulo 10 on the display. Returns the digit shown.
    pub fn set_display(&mut self, n: i64) -> Result<u8> {
        let digit = display_digit(n);
        let pattern = segment_pattern(digit);
        for (segment, level) in self.pins.segments.iter_mut().zip(pattern) {
            segment.set_level(level)?;
        }
        self.state.display = digit;
        debug!(digit, "Display updated");
        Ok(digit)
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn indicator_count(&self) -> usize {
        self.state.indicators.len()
    }

    fn indicator_index(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.state.indicators.len())
            .ok_or_else(|| HardwareError::out_of_range("indicator index", index))
    }

    fn write_indicator(&mut self, index: usize, on: bool) -> Result<()> {
        self.pins.indicators[index].set_level(on)?;
        self.state.indicators[index] = on;
        Ok(())
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("state", &self.state)
            .field("debounce_ms", &self.entry.window_ms())
            .finish_non_exhaustive()
    }
}
