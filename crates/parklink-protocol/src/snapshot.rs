//! Endpoint state mirror returned by `GET /estado`.

use serde::{Deserialize, Serialize};

/// Point-in-time read of an endpoint's inputs and outputs, as returned by
/// `GET /estado`.
///
/// Fields missing from a received body fall back to their zero value so a
/// firmware that omits one field still yields a usable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSnapshot {
    /// Debounced level of input 1 (entry button), 0 or 1.
    pub btn1: u8,

    /// Debounced level of input 2 (exit button), 0 or 1.
    pub btn2: u8,

    /// Light sensor reading normalized to 0..=1023.
    pub ldr: u16,

    /// Indicator output levels, index-addressed (0 = red, 1 = green).
    pub leds: Vec<u8>,

    /// Actuator position in degrees.
    pub servo: u16,

    /// Digit currently on the display.
    pub display: u8,
}

impl StatusSnapshot {
    /// `true` when input 1 reads high.
    pub fn entry_pressed(&self) -> bool {
        self.btn1 != 0
    }

    /// `true` when input 2 reads high.
    pub fn exit_pressed(&self) -> bool {
        self.btn2 != 0
    }

    /// Level of one indicator, `None` when out of range.
    pub fn indicator(&self, index: usize) -> Option<bool> {
        self.leds.get(index).map(|&level| level != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_wire_shape() {
        let snapshot = StatusSnapshot {
            btn1: 1,
            btn2: 0,
            ldr: 512,
            leds: vec![0, 1],
            servo: 90,
            display: 7,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "btn1": 1, "btn2": 0, "ldr": 512, "leds": [0, 1], "servo": 90, "display": 7
            })
        );
    }

    #[test]
    fn test_snapshot_lenient_parse() {
        let snapshot: StatusSnapshot =
            serde_json::from_str(r#"{"btn1": 1, "display": 4, "extra": "ignored"}"#).unwrap();
        assert!(snapshot.entry_pressed());
        assert!(!snapshot.exit_pressed());
        assert_eq!(snapshot.display, 4);
        assert!(snapshot.leds.is_empty());
    }

    #[test]
    fn test_indicator_lookup() {
        let snapshot = StatusSnapshot {
            leds: vec![1, 0],
            ..Default::default()
        };
        assert_eq!(snapshot.indicator(0), Some(true));
        assert_eq!(snapshot.indicator(1), Some(false));
        assert_eq!(snapshot.indicator(2), None);
    }
}
