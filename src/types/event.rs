//! Eye-movement events: blinks, saccades, fixations and fixation updates
//!
//! Start events normally carry only their start time. End events and fixation
//! updates carry summary statistics, and the `read` flags say which of them
//! were transmitted.

use serde::{Deserialize, Serialize};

use super::bitfield::Flags;
use super::eye::{Eye, XY};
use super::fixed::{
    MISSING_DATA, MISSING_UNSIGNED, Prescalers, decode, decode_unsigned, encode, encode_unsigned,
};
use super::link_flags::{event_read as rd, event_types};

/// Which eye-movement event a record reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[repr(u8)]
pub enum EventKind {
    StartBlink = 3,
    EndBlink = 4,
    StartSaccade = 5,
    EndSaccade = 6,
    StartFixation = 7,
    EndFixation = 8,
    FixationUpdate = 9,
}

impl EventKind {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            3 => EventKind::StartBlink,
            4 => EventKind::EndBlink,
            5 => EventKind::StartSaccade,
            6 => EventKind::EndSaccade,
            7 => EventKind::StartFixation,
            8 => EventKind::EndFixation,
            9 => EventKind::FixationUpdate,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this kind carries summary statistics.
    pub fn is_summary(self) -> bool {
        matches!(
            self,
            EventKind::EndBlink
                | EventKind::EndSaccade
                | EventKind::EndFixation
                | EventKind::FixationUpdate
        )
    }

    /// Event type flag this kind is announced under.
    pub fn type_flag(self) -> u16 {
        match self {
            EventKind::StartBlink | EventKind::EndBlink => event_types::BLINK,
            EventKind::StartSaccade | EventKind::EndSaccade => event_types::SACCADE,
            EventKind::StartFixation | EventKind::EndFixation => event_types::FIXATION,
            EventKind::FixationUpdate => event_types::FIXUPDATE,
        }
    }
}

/// Position and pupil size at one point of an event (start, end or average).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct IntEventPoint {
    /// Head-referenced position, or raw pupil position when `read` has PUPIL_XY.
    pub href: XY<i16>,
    pub gaze: XY<i16>,
    pub pupil_size: u16,
}

impl Default for IntEventPoint {
    fn default() -> Self {
        Self {
            href: XY::new(MISSING_DATA, MISSING_DATA),
            gaze: XY::new(MISSING_DATA, MISSING_DATA),
            pupil_size: MISSING_UNSIGNED,
        }
    }
}

/// An event as carried on the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct IntEvent {
    pub time: u32,
    pub kind: EventKind,
    pub eye: Eye,
    pub read: Flags,
    pub start_time: u32,
    pub end_time: u32,
    pub start: IntEventPoint,
    pub end: IntEventPoint,
    pub average: IntEventPoint,
    pub start_velocity: i16,
    pub end_velocity: i16,
    pub average_velocity: i16,
    pub peak_velocity: i16,
    pub start_resolution: XY<i16>,
    pub end_resolution: XY<i16>,
    pub status: u16,
}

impl IntEvent {
    /// An event carrying only its start time.
    pub fn new(time: u32, kind: EventKind, eye: Eye) -> Self {
        let missing_xy = XY::new(MISSING_DATA, MISSING_DATA);
        Self {
            time,
            kind,
            eye,
            read: Flags::EMPTY,
            start_time: time,
            end_time: 0,
            start: IntEventPoint::default(),
            end: IntEventPoint::default(),
            average: IntEventPoint::default(),
            start_velocity: MISSING_DATA,
            end_velocity: MISSING_DATA,
            average_velocity: MISSING_DATA,
            peak_velocity: MISSING_DATA,
            start_resolution: missing_xy,
            end_resolution: missing_xy,
            status: 0,
        }
    }

    pub fn has(&self, mask: u16) -> bool {
        self.read.has_flag(mask)
    }

    pub fn to_float(&self, prescalers: &Prescalers) -> FloatEvent {
        let point = |part: u16, p: &IntEventPoint| {
            let present = self.has(part);
            FloatEventPoint {
                href: if present && self.has(rd::HREF_XY | rd::PUPIL_XY) {
                    p.href.map(|v| decode(v, 1))
                } else {
                    XY::new(None, None)
                },
                gaze: if present && self.has(rd::GAZE_XY) {
                    p.gaze.map(|v| decode(v, prescalers.position))
                } else {
                    XY::new(None, None)
                },
                pupil_size: if present && self.has(rd::SIZE) {
                    decode_unsigned(p.pupil_size, prescalers.pupil)
                } else {
                    None
                },
            }
        };
        let velocity = |part: u16, v: i16| {
            (self.has(rd::VEL) && self.has(part)).then(|| decode(v, prescalers.velocity)).flatten()
        };
        let resolution = |part: u16, r: XY<i16>| {
            if self.has(rd::GRES) && self.has(part) {
                r.map(|v| decode(v, prescalers.resolution))
            } else {
                XY::new(None, None)
            }
        };

        FloatEventOf {
            time: self.time,
            kind: self.kind,
            eye: self.eye,
            read: self.read,
            start_time: self.start_time,
            end_time: self.has(rd::END_TIME).then_some(self.end_time),
            start: point(rd::BEG, &self.start),
            end: point(rd::END, &self.end),
            average: point(rd::AVG, &self.average),
            start_velocity: velocity(rd::BEG, self.start_velocity),
            end_velocity: velocity(rd::END, self.end_velocity),
            average_velocity: velocity(rd::AVG, self.average_velocity),
            peak_velocity: velocity(rd::AVG, self.peak_velocity),
            start_resolution: resolution(rd::BEG, self.start_resolution),
            end_resolution: resolution(rd::END, self.end_resolution),
            status: self.has(rd::STATUS).then_some(self.status),
        }
    }

    pub fn to_double(&self, prescalers: &Prescalers) -> DoubleEvent {
        self.to_float(prescalers).into_double()
    }
}

/// Event point in application units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct FloatEventPoint {
    pub href: XY<Option<f32>>,
    pub gaze: XY<Option<f32>>,
    pub pupil_size: Option<f32>,
}

impl FloatEventPoint {
    fn to_int(self, prescalers: &Prescalers) -> IntEventPoint {
        IntEventPoint {
            href: self.href.map(|v| encode(v, 1)),
            gaze: self.gaze.map(|v| encode(v, prescalers.position)),
            pupil_size: encode_unsigned(self.pupil_size, prescalers.pupil),
        }
    }
}

/// An event in application units. `T` is the timestamp type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct FloatEventOf<T> {
    pub time: T,
    pub kind: EventKind,
    pub eye: Eye,
    pub read: Flags,
    pub start_time: T,
    pub end_time: Option<T>,
    pub start: FloatEventPoint,
    pub end: FloatEventPoint,
    pub average: FloatEventPoint,
    pub start_velocity: Option<f32>,
    pub end_velocity: Option<f32>,
    pub average_velocity: Option<f32>,
    pub peak_velocity: Option<f32>,
    /// Units per degree at the start of the event.
    pub start_resolution: XY<Option<f32>>,
    pub end_resolution: XY<Option<f32>>,
    pub status: Option<u16>,
}

pub type FloatEvent = FloatEventOf<u32>;
pub type DoubleEvent = FloatEventOf<f64>;

impl<T: Copy> FloatEventOf<T> {
    fn retime<U>(&self, f: impl Fn(T) -> U) -> FloatEventOf<U> {
        FloatEventOf {
            time: f(self.time),
            kind: self.kind,
            eye: self.eye,
            read: self.read,
            start_time: f(self.start_time),
            end_time: self.end_time.map(&f),
            start: self.start,
            end: self.end,
            average: self.average,
            start_velocity: self.start_velocity,
            end_velocity: self.end_velocity,
            average_velocity: self.average_velocity,
            peak_velocity: self.peak_velocity,
            start_resolution: self.start_resolution,
            end_resolution: self.end_resolution,
            status: self.status,
        }
    }

    fn to_int_with(&self, prescalers: &Prescalers, f: impl Fn(T) -> u32) -> IntEvent {
        IntEvent {
            time: f(self.time),
            kind: self.kind,
            eye: self.eye,
            read: self.read,
            start_time: f(self.start_time),
            end_time: self.end_time.map_or(0, &f),
            start: self.start.to_int(prescalers),
            end: self.end.to_int(prescalers),
            average: self.average.to_int(prescalers),
            start_velocity: encode(self.start_velocity, prescalers.velocity),
            end_velocity: encode(self.end_velocity, prescalers.velocity),
            average_velocity: encode(self.average_velocity, prescalers.velocity),
            peak_velocity: encode(self.peak_velocity, prescalers.velocity),
            start_resolution: self.start_resolution.map(|v| encode(v, prescalers.resolution)),
            end_resolution: self.end_resolution.map(|v| encode(v, prescalers.resolution)),
            status: self.status.unwrap_or(0),
        }
    }

    /// Event duration in milliseconds, when the end time was transmitted.
    pub fn duration(&self) -> Option<f64>
    where
        T: Into<f64>,
    {
        self.end_time.map(|end| end.into() - self.start_time.into())
    }
}

impl FloatEvent {
    pub fn to_int(&self, prescalers: &Prescalers) -> IntEvent {
        self.to_int_with(prescalers, |t| t)
    }

    pub fn into_double(self) -> DoubleEvent {
        self.retime(f64::from)
    }
}

impl DoubleEvent {
    pub fn into_float(self) -> FloatEvent {
        self.retime(whole_millis)
    }

    pub fn to_int(&self, prescalers: &Prescalers) -> IntEvent {
        self.to_int_with(prescalers, whole_millis)
    }
}

fn whole_millis(time: f64) -> u32 {
    time.floor().clamp(0.0, f64::from(u32::MAX)) as u32
}
