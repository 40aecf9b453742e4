//! Conversions shared by the board model: servo pulse widths, the
//! seven-segment digit table and analog normalization.

use parklink_core::constants::{
    ADC_RAW_MAX, ANALOG_NORMALIZED_MAX, SEGMENT_COUNT, SERVO_MAX_ANGLE, SERVO_MAX_PULSE_MS,
    SERVO_MIN_PULSE_MS, SERVO_PERIOD_MS,
};

/// Segment levels (a, b, c, d, e, f, g) for digits 0-9 on a common-cathode
/// display. 1 lights the segment.
pub const SEGMENT_DIGITS: [[u8; SEGMENT_COUNT]; 10] = [
    [1, 1, 1, 1, 1, 1, 0], // 0
    [0, 1, 1, 0, 0, 0, 0], // 1
    [1, 1, 0, 1, 1, 0, 1], // 2
    [1, 1, 1, 1, 0, 0, 1], // 3
    [0, 1, 1, 0, 0, 1, 1], // 4
    [1, 0, 1, 1, 0, 1, 1], // 5
    [1, 0, 1, 1, 1, 1, 1], // 6
    [1, 1, 1, 0, 0, 0, 0], // 7
    [1, 1, 1, 1, 1, 1, 1], // 8
    [1, 1, 1, 1, 0, 1, 1], // 9
];

/// Reduce any integer to a display digit (Euclidean modulo 10).
///
/// ```
/// use parklink_hardware::types::display_digit;
///
/// assert_eq!(display_digit(7), 7);
/// assert_eq!(display_digit(12), 2);
/// assert_eq!(display_digit(-3), 7);
/// ```
pub fn display_digit(n: i64) -> u8 {
    n.rem_euclid(10) as u8
}

/// Segment levels for a digit in 0..=9.
pub fn segment_pattern(digit: u8) -> [bool; SEGMENT_COUNT] {
    let row = SEGMENT_DIGITS[usize::from(digit % 10)];
    row.map(|level| level != 0)
}

/// Clamp an angle into 0..=[`SERVO_MAX_ANGLE`].
pub fn clamp_angle(angle: i64) -> u16 {
    angle.clamp(0, i64::from(SERVO_MAX_ANGLE)) as u16
}

/// Pulse width in milliseconds for an angle: 0.5 ms at 0°, 2.5 ms at 180°,
/// linear in between.
pub fn servo_pulse_ms(angle: u16) -> f64 {
    let angle = f64::from(angle.min(SERVO_MAX_ANGLE));
    SERVO_MIN_PULSE_MS
        + (angle / f64::from(SERVO_MAX_ANGLE)) * (SERVO_MAX_PULSE_MS - SERVO_MIN_PULSE_MS)
}

/// 16-bit duty cycle for an angle over the 20 ms servo period.
///
/// ```
/// use parklink_hardware::types::servo_duty_u16;
///
/// assert_eq!(servo_duty_u16(0), 1638);
/// assert_eq!(servo_duty_u16(90), 4915);
/// assert_eq!(servo_duty_u16(180), 8191);
/// ```
pub fn servo_duty_u16(angle: u16) -> u16 {
    ((servo_pulse_ms(angle) / SERVO_PERIOD_MS) * f64::from(ADC_RAW_MAX)) as u16
}

/// Scale a raw 16-bit analog reading to 0..=[`ANALOG_NORMALIZED_MAX`].
pub fn normalize_analog(raw: u16) -> u16 {
    (u32::from(raw) * ANALOG_NORMALIZED_MAX / ADC_RAW_MAX) as u16
}
