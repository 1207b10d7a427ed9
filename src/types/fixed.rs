//! Fixed-point wire values and their floating-point expansion.
//!
//! Gaze, resolution, velocity and pupil fields travel as 16-bit integers scaled by
//! a per-block prescaler. The value `-32768` never denotes a measurement: it marks
//! a field that was not available for this record, and it expands to
//! [`MISSING_FLOAT`] (or `None` through [`decode`]) instead of `-32768 / prescaler`.
//!
//! Conversion is per field. Sibling fields of one record can be missing
//! independently, and each kind of field has its own prescaler (see [`Prescalers`]).

use serde::{Deserialize, Serialize};

use crate::{LinkError, Result};

/// Wire sentinel for a missing signed field.
pub const MISSING_DATA: i16 = i16::MIN;

/// Wire sentinel for a missing unsigned field (pupil size).
pub const MISSING_UNSIGNED: u16 = 0x8000;

/// Floating value a missing field expands to.
pub const MISSING_FLOAT: f32 = -32768.0;

fn divisor(prescaler: u16) -> f64 {
    f64::from(prescaler.max(1))
}

/// Expand a signed fixed-point value.
pub fn to_float(value: i16, prescaler: u16) -> f32 {
    if value == MISSING_DATA {
        return MISSING_FLOAT;
    }
    (f64::from(value) / divisor(prescaler)) as f32
}

/// Compress a floating value into signed fixed point.
///
/// Out-of-range values saturate at `±32767` so that they can never collide with
/// the sentinel. NaN and [`MISSING_FLOAT`] map to [`MISSING_DATA`].
pub fn from_float(value: f32, prescaler: u16) -> i16 {
    if value.is_nan() || value == MISSING_FLOAT {
        return MISSING_DATA;
    }
    let scaled = (f64::from(value) * divisor(prescaler)).round();
    scaled.clamp(-32767.0, 32767.0) as i16
}

/// Expand an unsigned fixed-point value.
pub fn to_float_unsigned(value: u16, prescaler: u16) -> f32 {
    if value == MISSING_UNSIGNED {
        return MISSING_FLOAT;
    }
    (f64::from(value) / divisor(prescaler)) as f32
}

/// Compress a floating value into unsigned fixed point.
pub fn from_float_unsigned(value: f32, prescaler: u16) -> u16 {
    if value.is_nan() || value == MISSING_FLOAT {
        return MISSING_UNSIGNED;
    }
    let scaled = (f64::from(value) * divisor(prescaler)).round().clamp(0.0, 65535.0) as u16;
    // A real measurement must not read back as the sentinel.
    if scaled == MISSING_UNSIGNED { MISSING_UNSIGNED + 1 } else { scaled }
}

/// Expand a signed field to `None` when it carries the sentinel.
pub fn decode(value: i16, prescaler: u16) -> Option<f32> {
    (value != MISSING_DATA).then(|| to_float(value, prescaler))
}

/// Expand an unsigned field to `None` when it carries the sentinel.
pub fn decode_unsigned(value: u16, prescaler: u16) -> Option<f32> {
    (value != MISSING_UNSIGNED).then(|| to_float_unsigned(value, prescaler))
}

/// Inverse of [`decode`].
pub fn encode(value: Option<f32>, prescaler: u16) -> i16 {
    value.map_or(MISSING_DATA, |v| from_float(v, prescaler))
}

/// Inverse of [`decode_unsigned`].
pub fn encode_unsigned(value: Option<f32>, prescaler: u16) -> u16 {
    value.map_or(MISSING_UNSIGNED, |v| from_float_unsigned(v, prescaler))
}

/// Divisors for each class of fixed-point field, negotiated per block.
///
/// Head-referenced and raw pupil coordinates are not prescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct Prescalers {
    /// Gaze position.
    pub position: u16,
    /// Gaze resolution (pixels per degree).
    pub resolution: u16,
    /// Event velocities.
    pub velocity: u16,
    /// Pupil size.
    pub pupil: u16,
}

impl Default for Prescalers {
    fn default() -> Self {
        Self { position: 10, resolution: 10, velocity: 1, pupil: 1 }
    }
}

impl Prescalers {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("position", self.position),
            ("resolution", self.resolution),
            ("velocity", self.velocity),
            ("pupil", self.pupil),
        ] {
            if value == 0 {
                return Err(LinkError::invalid_prescaler(field));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fixed_values_survive_expansion(value in -32767i16..=32767, prescaler in 1u16..=1000) {
            let expanded = to_float(value, prescaler);
            prop_assert_eq!(from_float(expanded, prescaler), value);
        }

        #[test]
        fn floats_round_trip_within_one_unit(value in -3000.0f32..3000.0, prescaler in 1u16..=10) {
            let back = to_float(from_float(value, prescaler), prescaler);
            prop_assert!((back - value).abs() <= 1.0 / f32::from(prescaler));
        }

        #[test]
        fn sentinel_never_scales(prescaler in 1u16..=u16::MAX) {
            prop_assert_eq!(to_float(MISSING_DATA, prescaler), MISSING_FLOAT);
            prop_assert_eq!(decode(MISSING_DATA, prescaler), None);
            prop_assert_eq!(to_float_unsigned(MISSING_UNSIGNED, prescaler), MISSING_FLOAT);
        }

        #[test]
        fn unsigned_values_survive_expansion(value in any::<u16>(), prescaler in 1u16..=100) {
            prop_assume!(value != MISSING_UNSIGNED);
            let expanded = to_float_unsigned(value, prescaler);
            prop_assert_eq!(from_float_unsigned(expanded, prescaler), value);
        }
    }

    #[test]
    fn saturation_avoids_sentinel() {
        assert_eq!(from_float(-1.0e9, 10), -32767);
        assert_eq!(from_float(1.0e9, 10), 32767);
        assert_eq!(from_float(f32::NAN, 10), MISSING_DATA);
        assert_eq!(from_float_unsigned(3276.8, 10), MISSING_UNSIGNED + 1);
    }

    #[test]
    fn zero_prescaler_acts_as_one() {
        assert_eq!(to_float(250, 0), 250.0);
        assert_eq!(from_float(250.0, 0), 250);
    }

    #[test]
    fn option_edges() {
        assert_eq!(decode(123, 10), Some(12.3));
        assert_eq!(encode(None, 10), MISSING_DATA);
        assert_eq!(encode(Some(12.3), 10), 123);
        assert_eq!(decode_unsigned(MISSING_UNSIGNED, 1), None);
        assert_eq!(encode_unsigned(Some(900.0), 1), 900);
    }

    #[test]
    fn prescaler_validation() {
        assert!(Prescalers::default().validate().is_ok());
        let bad = Prescalers { velocity: 0, ..Prescalers::default() };
        match bad.validate() {
            Err(LinkError::InvalidPrescaler { field }) => assert_eq!(field, "velocity"),
            other => panic!("expected InvalidPrescaler, got {other:?}"),
        }
    }
}
