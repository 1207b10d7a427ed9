//! The closed set of records delivered over the link.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::bitfield::{Flags, GapFlags};
use super::event::{DoubleEvent, EventKind, FloatEvent, IntEvent};
use super::fixed::Prescalers;
use super::link_flags::event_types;
use super::sample::{DoubleSample, FloatSample, IntSample};

/// Longest message payload the link carries.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Type discriminant leading every wire record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[repr(u8)]
pub enum RecordKind {
    StartBlink = 3,
    EndBlink = 4,
    StartSaccade = 5,
    EndSaccade = 6,
    StartFixation = 7,
    EndFixation = 8,
    FixationUpdate = 9,
    StartSamples = 15,
    EndSamples = 16,
    StartEvents = 17,
    EndEvents = 18,
    Message = 24,
    Button = 25,
    Input = 28,
    DataLost = 0x3F,
    Sample = 200,
}

impl RecordKind {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            3 => RecordKind::StartBlink,
            4 => RecordKind::EndBlink,
            5 => RecordKind::StartSaccade,
            6 => RecordKind::EndSaccade,
            7 => RecordKind::StartFixation,
            8 => RecordKind::EndFixation,
            9 => RecordKind::FixationUpdate,
            15 => RecordKind::StartSamples,
            16 => RecordKind::EndSamples,
            17 => RecordKind::StartEvents,
            18 => RecordKind::EndEvents,
            24 => RecordKind::Message,
            25 => RecordKind::Button,
            28 => RecordKind::Input,
            0x3F => RecordKind::DataLost,
            200 => RecordKind::Sample,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn class(self) -> RecordClass {
        match self {
            RecordKind::Sample => RecordClass::Sample,
            RecordKind::StartSamples
            | RecordKind::EndSamples
            | RecordKind::StartEvents
            | RecordKind::EndEvents
            | RecordKind::DataLost => RecordClass::Control,
            _ => RecordClass::Event,
        }
    }
}

impl From<EventKind> for RecordKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::StartBlink => RecordKind::StartBlink,
            EventKind::EndBlink => RecordKind::EndBlink,
            EventKind::StartSaccade => RecordKind::StartSaccade,
            EventKind::EndSaccade => RecordKind::EndSaccade,
            EventKind::StartFixation => RecordKind::StartFixation,
            EventKind::EndFixation => RecordKind::EndFixation,
            EventKind::FixationUpdate => RecordKind::FixationUpdate,
        }
    }
}

/// Accounting class of a record. Messages and IO changes count as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum RecordClass {
    Sample,
    Event,
    Control,
}

impl RecordClass {
    /// Gap flag raised when a record of this class is lost.
    pub fn gap_flag(self) -> GapFlags {
        match self {
            RecordClass::Sample => GapFlags::SAMPLE,
            RecordClass::Event => GapFlags::EVENT,
            RecordClass::Control => GapFlags::CONTROL,
        }
    }
}

/// Block framing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ControlKind {
    StartSamples,
    EndSamples,
    StartEvents,
    EndEvents,
    /// The tracker reports that link data was lost upstream.
    DataLost,
}

impl ControlKind {
    pub fn record_kind(self) -> RecordKind {
        match self {
            ControlKind::StartSamples => RecordKind::StartSamples,
            ControlKind::EndSamples => RecordKind::EndSamples,
            ControlKind::StartEvents => RecordKind::StartEvents,
            ControlKind::EndEvents => RecordKind::EndEvents,
            ControlKind::DataLost => RecordKind::DataLost,
        }
    }

    pub fn is_block_start(self) -> bool {
        matches!(self, ControlKind::StartSamples | ControlKind::StartEvents)
    }
}

/// Data format the tracker negotiated for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct BlockHeader {
    pub sample_data: Flags,
    pub event_data: Flags,
    pub event_types: Flags,
    pub prescalers: Prescalers,
    /// Samples per second.
    pub sample_rate: u16,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            sample_data: Flags::EMPTY,
            event_data: Flags::EMPTY,
            event_types: Flags::EMPTY,
            prescalers: Prescalers::default(),
            sample_rate: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ControlRecord {
    pub time: u32,
    pub kind: ControlKind,
    /// Present on block starts only.
    pub header: Option<BlockHeader>,
}

/// A user message. The payload is opaque bytes and is never reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct MessageRecord {
    pub time: u32,
    pub payload: Vec<u8>,
}

impl MessageRecord {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum IoKind {
    /// Low byte is button state, high byte is buttons changed.
    Button,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct IoEvent {
    pub time: u32,
    pub kind: IoKind,
    pub data: u16,
}

/// A decoded link record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Record {
    Sample(IntSample),
    Event(IntEvent),
    Message(MessageRecord),
    Io(IoEvent),
    Control(ControlRecord),
}

impl Record {
    pub fn time(&self) -> u32 {
        match self {
            Record::Sample(s) => s.time,
            Record::Event(e) => e.time,
            Record::Message(m) => m.time,
            Record::Io(io) => io.time,
            Record::Control(c) => c.time,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Sample(_) => RecordKind::Sample,
            Record::Event(e) => e.kind.into(),
            Record::Message(_) => RecordKind::Message,
            Record::Io(io) => match io.kind {
                IoKind::Button => RecordKind::Button,
                IoKind::Input => RecordKind::Input,
            },
            Record::Control(c) => c.kind.record_kind(),
        }
    }

    pub fn class(&self) -> RecordClass {
        self.kind().class()
    }

    pub fn as_sample(&self) -> Option<&IntSample> {
        match self {
            Record::Sample(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlRecord> {
        match self {
            Record::Control(c) => Some(c),
            _ => None,
        }
    }

    /// Event type flag this record contributes to the "types seen" summary.
    pub fn event_type_flags(&self) -> u16 {
        match self {
            Record::Event(e) => e.kind.type_flag() | e.eye.event_type_flag(),
            Record::Message(_) => event_types::MESSAGE,
            Record::Io(io) => match io.kind {
                IoKind::Button => event_types::BUTTON,
                IoKind::Input => event_types::INPUT,
            },
            _ => 0,
        }
    }

    pub fn to_float(&self, prescalers: &Prescalers) -> FloatRecord {
        match self {
            Record::Sample(s) => FloatRecord::Sample(s.to_float(prescalers)),
            Record::Event(e) => FloatRecord::Event(e.to_float(prescalers)),
            Record::Message(m) => FloatRecord::Message(m.clone()),
            Record::Io(io) => FloatRecord::Io(*io),
            Record::Control(c) => FloatRecord::Control(c.clone()),
        }
    }

    pub fn to_double(&self, prescalers: &Prescalers) -> DoubleRecord {
        match self {
            Record::Sample(s) => DoubleRecord::Sample(s.to_double(prescalers)),
            Record::Event(e) => DoubleRecord::Event(e.to_double(prescalers)),
            Record::Message(m) => DoubleRecord::Message(m.clone()),
            Record::Io(io) => DoubleRecord::Io(*io),
            Record::Control(c) => DoubleRecord::Control(c.clone()),
        }
    }
}

/// A record with samples and events in application units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum FloatRecord {
    Sample(FloatSample),
    Event(FloatEvent),
    Message(MessageRecord),
    Io(IoEvent),
    Control(ControlRecord),
}

/// A record with floating timestamps on samples and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum DoubleRecord {
    Sample(DoubleSample),
    Event(DoubleEvent),
    Message(MessageRecord),
    Io(IoEvent),
    Control(ControlRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Eye;

    #[test]
    fn codes_round_trip_through_kinds() {
        for code in 0..=u8::MAX {
            if let Some(kind) = RecordKind::from_code(code) {
                assert_eq!(kind.code(), code);
            }
        }
        assert_eq!(RecordKind::from_code(0x3F), Some(RecordKind::DataLost));
        assert_eq!(RecordKind::from_code(1), None);
    }

    #[test]
    fn classes() {
        assert_eq!(RecordKind::Sample.class(), RecordClass::Sample);
        assert_eq!(RecordKind::Message.class(), RecordClass::Event);
        assert_eq!(RecordKind::Button.class(), RecordClass::Event);
        assert_eq!(RecordKind::DataLost.class(), RecordClass::Control);
        assert_eq!(RecordClass::Control.gap_flag(), GapFlags::CONTROL);
    }

    #[test]
    fn record_accessors() {
        let event = Record::Event(IntEvent::new(10, EventKind::EndBlink, Eye::Left));
        assert_eq!(event.kind(), RecordKind::EndBlink);
        assert_eq!(event.time(), 10);
        assert_eq!(event.event_type_flags(), event_types::BLINK | event_types::LEFT_EYE);

        let io = Record::Io(IoEvent { time: 11, kind: IoKind::Input, data: 0x00FF });
        assert_eq!(io.kind(), RecordKind::Input);
        assert!(io.as_sample().is_none());
    }

    #[test]
    fn message_payload_is_opaque() {
        let message = MessageRecord { time: 1, payload: vec![b'T', b'R', 0xFF, 0x00] };
        assert_eq!(message.payload.len(), 4);
        assert!(message.text().starts_with("TR"));
    }
}
