//! Eye identifiers and per-eye value pairs

use serde::{Deserialize, Serialize};

use super::link_flags::{event_types, sample_content};

/// One eye, as identified on the link (0 = left, 1 = right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[repr(u8)]
pub enum Eye {
    Left = 0,
    Right = 1,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Eye::Left),
            1 => Some(Eye::Right),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Sample content flag announcing data for this eye.
    pub fn content_flag(self) -> u16 {
        match self {
            Eye::Left => sample_content::LEFT,
            Eye::Right => sample_content::RIGHT,
        }
    }

    /// Event type flag announcing events for this eye.
    pub fn event_type_flag(self) -> u16 {
        match self {
            Eye::Left => event_types::LEFT_EYE,
            Eye::Right => event_types::RIGHT_EYE,
        }
    }
}

/// A value held for each eye.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct EyePair<T> {
    pub left: T,
    pub right: T,
}

impl<T> EyePair<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, eye: Eye) -> &T {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, eye: Eye) -> &mut T {
        match eye {
            Eye::Left => &mut self.left,
            Eye::Right => &mut self.right,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Eye, T) -> U) -> EyePair<U> {
        EyePair { left: f(Eye::Left, self.left), right: f(Eye::Right, self.right) }
    }
}

impl<T: Clone> EyePair<T> {
    pub fn both(value: T) -> Self {
        Self { left: value.clone(), right: value }
    }
}

/// A horizontal and vertical component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct XY<T> {
    pub x: T,
    pub y: T,
}

impl<T> XY<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> XY<U> {
        XY { x: f(self.x), y: f(self.y) }
    }
}

/// Which eyes the tracker is currently reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum EyeAvailability {
    Left,
    Right,
    Binocular,
}

impl EyeAvailability {
    pub fn from_presence(left: bool, right: bool) -> Option<Self> {
        match (left, right) {
            (true, true) => Some(EyeAvailability::Binocular),
            (true, false) => Some(EyeAvailability::Left),
            (false, true) => Some(EyeAvailability::Right),
            (false, false) => None,
        }
    }

    /// Numeric code used by tracker tooling (0 left, 1 right, 2 binocular).
    pub fn code(self) -> u8 {
        match self {
            EyeAvailability::Left => 0,
            EyeAvailability::Right => 1,
            EyeAvailability::Binocular => 2,
        }
    }

    pub fn includes(self, eye: Eye) -> bool {
        matches!(
            (self, eye),
            (EyeAvailability::Binocular, _)
                | (EyeAvailability::Left, Eye::Left)
                | (EyeAvailability::Right, Eye::Right)
        )
    }
}
