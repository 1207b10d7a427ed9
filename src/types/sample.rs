//! Sample records in fixed-point and floating-point form
//!
//! [`IntSample`] mirrors the wire: every field is always present and a field that
//! was not transmitted holds the missing sentinel. [`FloatSampleOf`] is the
//! application form where absence is `None`. The two interconvert exactly for
//! samples whose untransmitted fields hold the sentinel, which is what the
//! decoder produces.

use serde::{Deserialize, Serialize};

use super::bitfield::{Flags, has_half_ms_offset};
use super::eye::{Eye, EyePair, XY};
use super::fixed::{
    MISSING_DATA, MISSING_UNSIGNED, Prescalers, decode, decode_unsigned, encode, encode_unsigned,
};
use super::link_flags::sample_content as sc;

/// Maximum number of head-tracker channels a sample carries.
pub const MAX_HEAD_CHANNELS: usize = 8;

/// Head-tracker data attached to a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct HeadData {
    pub kind: i16,
    pub channels: Vec<i16>,
}

/// A sample as carried on the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct IntSample {
    pub time: u32,
    pub content: Flags,
    pub pupil: EyePair<XY<i16>>,
    pub href: EyePair<XY<i16>>,
    pub gaze: EyePair<XY<i16>>,
    pub resolution: XY<i16>,
    pub pupil_size: EyePair<u16>,
    pub status: u16,
    pub input: u16,
    pub buttons: u16,
    pub head: HeadData,
}

const MISSING_XY: XY<i16> = XY { x: MISSING_DATA, y: MISSING_DATA };

impl IntSample {
    /// A sample with a timestamp and nothing else.
    pub fn new(time: u32) -> Self {
        Self {
            time,
            content: Flags(sc::TIMESTAMP),
            pupil: EyePair::both(MISSING_XY),
            href: EyePair::both(MISSING_XY),
            gaze: EyePair::both(MISSING_XY),
            resolution: MISSING_XY,
            pupil_size: EyePair::both(MISSING_UNSIGNED),
            status: 0,
            input: 0,
            buttons: 0,
            head: HeadData::default(),
        }
    }

    pub fn has(&self, mask: u16) -> bool {
        self.content.has_flag(mask)
    }

    pub fn has_eye(&self, eye: Eye) -> bool {
        self.content.has_flag(eye.content_flag())
    }

    /// Timestamp in milliseconds including the half-millisecond offset.
    pub fn effective_time(&self) -> f64 {
        effective_time(self.time, self.content)
    }

    /// Expand to floating point with 32-bit timestamps.
    pub fn to_float(&self, prescalers: &Prescalers) -> FloatSample {
        let eye_xy = |eye: Eye, group: u16, pair: &EyePair<XY<i16>>, scale: u16| {
            if self.has_eye(eye) && self.has(group) {
                pair.get(eye).map(|v| decode(v, scale))
            } else {
                XY::new(None, None)
            }
        };
        let resolution = if self.has(sc::GAZE_RES) {
            self.resolution.map(|v| decode(v, prescalers.resolution))
        } else {
            XY::new(None, None)
        };

        FloatSampleOf {
            time: self.time,
            content: self.content,
            pupil: EyePair::both(()).map(|eye, _| eye_xy(eye, sc::PUPIL_XY, &self.pupil, 1)),
            href: EyePair::both(()).map(|eye, _| eye_xy(eye, sc::HREF_XY, &self.href, 1)),
            gaze: EyePair::both(()).map(|eye, _| {
                eye_xy(eye, sc::GAZE_XY, &self.gaze, prescalers.position)
            }),
            resolution,
            pupil_size: EyePair::both(()).map(|eye, _| {
                if self.has_eye(eye) && self.has(sc::PUPIL_SIZE) {
                    decode_unsigned(*self.pupil_size.get(eye), prescalers.pupil)
                } else {
                    None
                }
            }),
            status: self.has(sc::STATUS).then_some(self.status),
            input: self.has(sc::INPUTS).then_some(self.input),
            buttons: self.has(sc::BUTTONS).then_some(self.buttons),
            head: self.has(sc::HEAD_POS).then(|| self.head.clone()),
        }
    }

    /// Expand to floating point with a floating timestamp.
    pub fn to_double(&self, prescalers: &Prescalers) -> DoubleSample {
        self.to_float(prescalers).into_double()
    }
}

/// A sample in application units. `T` is the timestamp type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct FloatSampleOf<T> {
    pub time: T,
    pub content: Flags,
    /// Raw pupil coordinates (camera units).
    pub pupil: EyePair<XY<Option<f32>>>,
    /// Head-referenced eye position.
    pub href: EyePair<XY<Option<f32>>>,
    /// Gaze position in display pixels.
    pub gaze: EyePair<XY<Option<f32>>>,
    /// Pixels per degree of visual angle.
    pub resolution: XY<Option<f32>>,
    pub pupil_size: EyePair<Option<f32>>,
    pub status: Option<u16>,
    pub input: Option<u16>,
    pub buttons: Option<u16>,
    pub head: Option<HeadData>,
}

/// Floating-point sample with the integer millisecond timestamp.
pub type FloatSample = FloatSampleOf<u32>;

/// Floating-point sample with a floating millisecond timestamp.
pub type DoubleSample = FloatSampleOf<f64>;

impl<T> FloatSampleOf<T> {
    pub fn has(&self, mask: u16) -> bool {
        self.content.has_flag(mask)
    }

    pub fn has_eye(&self, eye: Eye) -> bool {
        self.content.has_flag(eye.content_flag())
    }

    fn with_time<U>(self, time: U, content: Flags) -> FloatSampleOf<U> {
        FloatSampleOf {
            time,
            content,
            pupil: self.pupil,
            href: self.href,
            gaze: self.gaze,
            resolution: self.resolution,
            pupil_size: self.pupil_size,
            status: self.status,
            input: self.input,
            buttons: self.buttons,
            head: self.head,
        }
    }

    fn to_int_at(&self, time: u32, content: Flags, prescalers: &Prescalers) -> IntSample {
        let xy = |pair: &EyePair<XY<Option<f32>>>, scale: u16| {
            pair.map(|_, v| v.map(|c| encode(c, scale)))
        };
        IntSample {
            time,
            content,
            pupil: xy(&self.pupil, 1),
            href: xy(&self.href, 1),
            gaze: xy(&self.gaze, prescalers.position),
            resolution: self.resolution.map(|v| encode(v, prescalers.resolution)),
            pupil_size: self.pupil_size.map(|_, v| encode_unsigned(v, prescalers.pupil)),
            status: self.status.unwrap_or(0),
            input: self.input.unwrap_or(0),
            buttons: self.buttons.unwrap_or(0),
            head: self.head.clone().unwrap_or_default(),
        }
    }
}

impl FloatSample {
    pub fn effective_time(&self) -> f64 {
        effective_time(self.time, self.content)
    }

    pub fn to_int(&self, prescalers: &Prescalers) -> IntSample {
        self.to_int_at(self.time, self.content, prescalers)
    }

    pub fn into_double(self) -> DoubleSample {
        let time = self.effective_time();
        let content = self.content;
        self.with_time(time, content)
    }
}

impl DoubleSample {
    /// Fold the floating timestamp back into milliseconds plus the offset flag.
    pub fn into_float(self) -> FloatSample {
        let (time, content) = split_time(self.time, self.content);
        self.with_time(time, content)
    }

    pub fn to_int(&self, prescalers: &Prescalers) -> IntSample {
        let (time, content) = split_time(self.time, self.content);
        self.to_int_at(time, content, prescalers)
    }
}

fn effective_time(time: u32, content: Flags) -> f64 {
    let base = f64::from(time);
    if has_half_ms_offset(content) { base + 0.5 } else { base }
}

fn split_time(time: f64, content: Flags) -> (u32, Flags) {
    let whole = time.floor();
    let content = if time - whole >= 0.5 {
        content.with(sc::ADD_OFFSET)
    } else {
        content.without(sc::ADD_OFFSET)
    };
    (whole.clamp(0.0, f64::from(u32::MAX)) as u32, content)
}
