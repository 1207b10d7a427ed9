//! Link packet codec.
//!
//! ## Layout
//!
//! All integers are little-endian. Every packet starts with a `u8` type code and
//! a `u32` millisecond timestamp, followed by a body that depends on the code:
//!
//! | Code | Record | Body |
//! |------|--------|------|
//! | 200 | sample | `u16` content flags, then each group the flags announce |
//! | 3..=9 | eye event | `u8` eye, `u16` read flags, `u32` start time, summary fields |
//! | 15, 17 | block start | flags, prescalers, sample rate (eight `u16`) |
//! | 16, 18, 0x3F | block end, data lost | empty |
//! | 24 | message | `u16` length (at most 255), payload |
//! | 25, 28 | button, input | `u16` data word |
//!
//! Sample groups come in flag order: pupil xy, href xy, gaze xy (an `i16` pair
//! per present eye, left first), gaze resolution pair, pupil size (`u16` per
//! present eye), status, inputs, buttons, then head data (`i16` type, `u8`
//! channel count of at most eight, one `i16` per channel).
//!
//! Event summaries follow the `read` flags: optional `u32` end time; for each of
//! start, end and average that is present an href pair and a gaze pair; pupil
//! sizes; start, end, average and peak velocities; start and end resolution
//! pairs; and a `u16` status word.

mod decode;
mod encode;

pub use decode::decode;
pub use encode::{encode, encoded_len};
