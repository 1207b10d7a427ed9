//! Constants for interpreting link flag words
//!
//! Bit assignments for sample content flags, event `read` flags, event type and
//! event data flags announced in block headers, gap flags, and the sample status
//! word.

/// Sample content flags: which fields a sample carries.
pub mod sample_content {
    pub const LEFT: u16 = 0x8000;
    pub const RIGHT: u16 = 0x4000;
    pub const TIMESTAMP: u16 = 0x2000; // always set on link samples
    pub const PUPIL_XY: u16 = 0x1000;
    pub const HREF_XY: u16 = 0x0800;
    pub const GAZE_XY: u16 = 0x0400;
    pub const GAZE_RES: u16 = 0x0200; // pixels per degree, x and y
    pub const PUPIL_SIZE: u16 = 0x0100;
    pub const STATUS: u16 = 0x0080;
    pub const INPUTS: u16 = 0x0040;
    pub const BUTTONS: u16 = 0x0020; // low byte state, high byte changes
    pub const HEAD_POS: u16 = 0x0010;
    pub const TAGGED: u16 = 0x0008;
    pub const USER_TAGGED: u16 = 0x0004;
    /// Add half a millisecond to the integer timestamp.
    pub const ADD_OFFSET: u16 = 0x0002;
}

/// Event `read` flags: which summary fields an eye event carries.
pub mod event_read {
    pub const BEG: u16 = 0x0001;
    pub const END: u16 = 0x0002;
    pub const AVG: u16 = 0x0004;
    pub const BEG_POS: u16 = 0x0008;
    pub const END_POS: u16 = 0x0010;
    pub const AVG_POS: u16 = 0x0020;
    pub const END_TIME: u16 = 0x0040; // start time is always read
    pub const SIZE: u16 = 0x0080;
    pub const VEL: u16 = 0x0100;
    pub const GRES: u16 = 0x0200;
    pub const PUPIL_XY: u16 = 0x0400; // replaces href data when set
    pub const HREF_XY: u16 = 0x0800;
    pub const GAZE_XY: u16 = 0x1000;
    pub const STATUS: u16 = 0x2000;
}

/// Event type flags: which kinds of events the tracker produces.
pub mod event_types {
    pub const LEFT_EYE: u16 = 0x8000;
    pub const RIGHT_EYE: u16 = 0x4000;
    pub const BLINK: u16 = 0x2000;
    pub const FIXATION: u16 = 0x1000;
    pub const FIXUPDATE: u16 = 0x0800;
    pub const SACCADE: u16 = 0x0400;
    pub const MESSAGE: u16 = 0x0200;
    pub const BUTTON: u16 = 0x0040;
    pub const INPUT: u16 = 0x0020;
}

/// Event data flags: which data the tracker includes in events.
pub mod event_data {
    pub const VELOCITY: u16 = 0x8000;
    pub const PUPIL_SIZE: u16 = 0x4000;
    pub const GAZE_RES: u16 = 0x2000;
    pub const STATUS: u16 = 0x1000;
    pub const GAZE_XY: u16 = 0x0400;
    pub const HREF_XY: u16 = 0x0200;
    pub const PUPIL_XY: u16 = 0x0100;
    pub const FIX_AVG_ONLY: u16 = 0x0008;
    pub const START_TIME_ONLY: u16 = 0x0004;
    pub const PARSED_BY_GAZE: u16 = 0x00C0;
    pub const PARSED_BY_HREF: u16 = 0x0080;
    pub const PARSED_BY_PUPIL: u16 = 0x0040;
}

/// Records lost before a delivered item, by class.
pub mod gap {
    pub const SAMPLE: u16 = 0x8000;
    pub const EVENT: u16 = 0x4000;
    pub const CONTROL: u16 = 0x2000;
}

/// Sample status word warnings.
pub mod status {
    pub const HPOS_TOP: u16 = 0x0080;
    pub const HPOS_BOTTOM: u16 = 0x0040;
    pub const HPOS_LEFT: u16 = 0x0020;
    pub const HPOS_RIGHT: u16 = 0x0010;
    pub const HPOS_ANY: u16 = 0x00F0;
    pub const HPOS_ANGLE: u16 = 0x0008;
    pub const HPOS_MISSING: u16 = 0x0004;
    pub const CALIBRATION_AREA: u16 = 0x0002;
    pub const HPOS_DISTANCE: u16 = 0x0001;
    pub const CR_LOST_LEFT: u16 = 0x0100;
    pub const CR_LOST_RIGHT: u16 = 0x0200;
    pub const CR_RECOVERED_LEFT: u16 = 0x0400;
    pub const CR_RECOVERED_RIGHT: u16 = 0x0800;
    pub const INTERP_SAMPLE: u16 = 0x1000;
    pub const MATH_ERROR: u16 = 0x2000;
    pub const INTERP_PUPIL: u16 = 0x8000;
}
