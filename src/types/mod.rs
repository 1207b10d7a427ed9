//! Core types for link telemetry.
//!
//! Every record the tracker sends is one variant of [`Record`]: a [`IntSample`],
//! an [`IntEvent`], a [`MessageRecord`], an [`IoEvent`] or a [`ControlRecord`].
//! Samples and events exist in three numeric forms:
//!
//! - the fixed-point wire form (`IntSample`, `IntEvent`), where `-32768` marks a
//!   field that was not transmitted;
//! - a floating form with integer millisecond timestamps ([`FloatSample`],
//!   [`FloatEvent`]), where absent fields are `None`;
//! - a floating form with floating timestamps ([`DoubleSample`],
//!   [`DoubleEvent`]) that carries the half-millisecond offset used by trackers
//!   sampling faster than 1 kHz.
//!
//! Field presence always comes from the content or `read` flags, never from the
//! value: zero is a legitimate measurement for several fields.
//!
//! ## Usage Example
//!
//! ```rust
//! use gazelink::types::{Eye, Flags, IntSample, Prescalers, XY};
//! use gazelink::types::link_flags::sample_content as sc;
//!
//! let mut sample = IntSample::new(1_000);
//! sample.content = Flags(sc::TIMESTAMP | sc::LEFT | sc::GAZE_XY);
//! sample.gaze.left = XY::new(5120, 3840);
//!
//! let float = sample.to_float(&Prescalers::default());
//! assert_eq!(float.gaze.get(Eye::Left).x, Some(512.0));
//! assert_eq!(float.gaze.right, XY::new(None, None));
//! assert_eq!(float.to_int(&Prescalers::default()), sample);
//! ```

mod bitfield;
mod event;
mod eye;
pub mod fixed;
pub mod link_flags;
mod record;
mod sample;
mod update_rate;

pub use bitfield::{
    Flags, GapFlags, corneal_reflection_lost, has_half_ms_offset, head_position_warning,
    time_after,
};
pub use event::{
    DoubleEvent, EventKind, FloatEvent, FloatEventOf, FloatEventPoint, IntEvent, IntEventPoint,
};
pub use eye::{Eye, EyeAvailability, EyePair, XY};
pub use fixed::{MISSING_DATA, MISSING_FLOAT, MISSING_UNSIGNED, Prescalers};
pub use record::{
    BlockHeader, ControlKind, ControlRecord, DoubleRecord, FloatRecord, IoEvent, IoKind,
    MAX_MESSAGE_LEN, MessageRecord, Record, RecordClass, RecordKind,
};
pub use sample::{
    DoubleSample, FloatSample, FloatSampleOf, HeadData, IntSample, MAX_HEAD_CHANNELS,
};
pub use update_rate::UpdateRate;
