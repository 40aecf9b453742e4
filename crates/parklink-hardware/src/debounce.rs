//! Time-based debouncing for digital inputs.
//!
//! A new raw level is accepted only when it differs from the last accepted
//! level and more than `window_ms` has elapsed since the last accepted
//! change. The first change after construction is accepted immediately.
//!
//! ```
//! use parklink_hardware::debounce::Debouncer;
//!
//! let mut input = Debouncer::new(150);
//! assert!(input.update(true, 1_000));   // accepted
//! assert!(!input.update(false, 1_050)); // bounce, rejected
//! assert!(input.level());
//! assert!(input.update(false, 1_200));  // window elapsed, accepted
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Debounce state for one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debouncer {
    window_ms: u64,
    level: bool,
    last_change_ms: Option<u64>,
}

impl Debouncer {
    /// Create a debouncer with the given window, starting low.
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            level: false,
            last_change_ms: None,
        }
    }

    pub fn with_window(window: Duration) -> Self {
        Self::new(window.as_millis() as u64)
    }

    /// Feed one raw sample taken at `now_ms`.
    ///
    /// Returns `true` if the accepted level changed.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> bool {
        if raw == self.level {
            return false;
        }

        let settled = match self.last_change_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.window_ms,
        };
        if !settled {
            return false;
        }

        self.level = raw;
        self.last_change_ms = Some(now_ms);
        true
    }

    /// Last accepted level.
    pub fn level(&self) -> bool {
        self.level
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}
