//! Delivery rate control for latest-sample streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a latest-sample stream may yield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum UpdateRate {
    /// Every new sample, at the tracker's sample rate
    Native,

    /// At most this many samples per second, newest wins.
    /// A limit at or above the source rate behaves like Native.
    Max(u32),
}

impl UpdateRate {
    /// Normalize against the source rate in Hz
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if f64::from(hz) >= source_hz => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Minimum spacing between yielded items, if any
    pub fn min_interval(self, source_hz: f64) -> Option<Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_above_source_rate_are_native() {
        assert_eq!(UpdateRate::Max(2000).normalize(1000.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(1000).normalize(1000.0), UpdateRate::Native);
        assert_eq!(UpdateRate::Max(60).normalize(1000.0), UpdateRate::Max(60));
        assert_eq!(UpdateRate::Max(0).normalize(500.0), UpdateRate::Native);
    }

    #[test]
    fn interval_from_limit() {
        assert_eq!(UpdateRate::Native.min_interval(500.0), None);
        assert_eq!(UpdateRate::Max(100).min_interval(500.0), Some(Duration::from_millis(10)));
    }
}
