//! Consumer-side summary of what the link is currently delivering

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::link_flags::sample_content as sc;
use crate::types::{
    BlockHeader, ControlKind, ControlRecord, Eye, EyeAvailability, EyePair, Flags, GapFlags,
    IntSample, Prescalers, Record, XY,
};

/// Block framing and content summary, updated from delivered records.
///
/// The state changes only through [`apply`](Self::apply) and
/// [`apply_dropped`](Self::apply_dropped). Every query answers empty (no flags,
/// no eye, not in a block) until the first control record has been applied.
#[derive(Debug, Clone)]
pub struct LinkState {
    default_prescalers: Prescalers,
    started: bool,
    in_sample_block: bool,
    in_event_block: bool,
    sample_header: Option<BlockHeader>,
    event_header: Option<BlockHeader>,
    seen_event_types: Flags,
    seen_eyes: EyePair<bool>,
    last_resolution: Option<XY<i16>>,
    last_pupil_size: EyePair<Option<u16>>,
    last_status: Option<u16>,
    last_gaps: GapFlags,
    block_number: u32,
    block_samples: u64,
    block_events: u64,
}

impl LinkState {
    /// Fresh state; `default_prescalers` apply until a block header arrives.
    pub fn new(default_prescalers: Prescalers) -> Self {
        Self {
            default_prescalers,
            started: false,
            in_sample_block: false,
            in_event_block: false,
            sample_header: None,
            event_header: None,
            seen_event_types: Flags::EMPTY,
            seen_eyes: EyePair::both(false),
            last_resolution: None,
            last_pupil_size: EyePair::both(None),
            last_status: None,
            last_gaps: GapFlags::NONE,
            block_number: 0,
            block_samples: 0,
            block_events: 0,
        }
    }

    /// Apply a delivered record. `gaps` are the losses reported before it.
    pub fn apply(&mut self, record: &Record, gaps: GapFlags) {
        self.last_gaps = gaps;
        self.update(record);
    }

    /// Apply a record that was evicted before delivery.
    ///
    /// Only control records change the state here, so block framing
    /// survives overflow. The last-item gap flags are left alone.
    pub fn apply_dropped(&mut self, record: &Record) {
        if let Record::Control(control) = record {
            self.apply_control(control);
        }
    }

    fn update(&mut self, record: &Record) {
        match record {
            Record::Control(control) => self.apply_control(control),
            Record::Sample(sample) => self.apply_sample(sample),
            Record::Event(_) | Record::Message(_) | Record::Io(_) => {
                self.block_events += 1;
                self.seen_event_types |= Flags(record.event_type_flags());
            }
        }
    }

    fn apply_control(&mut self, control: &ControlRecord) {
        self.started = true;
        let header = control.header.unwrap_or(BlockHeader {
            prescalers: self.default_prescalers,
            ..BlockHeader::default()
        });
        match control.kind {
            ControlKind::StartSamples => {
                self.begin_block();
                self.in_sample_block = true;
                self.sample_header = Some(header);
                self.block_samples = 0;
                debug!(
                    "Sample block {} started at {} (content {}, {} Hz)",
                    self.block_number, control.time, header.sample_data, header.sample_rate
                );
            }
            ControlKind::StartEvents => {
                self.begin_block();
                self.in_event_block = true;
                self.event_header = Some(header);
                self.block_events = 0;
                debug!(
                    "Event block {} started at {} (types {})",
                    self.block_number, control.time, header.event_types
                );
            }
            ControlKind::EndSamples => {
                self.in_sample_block = false;
                debug!(
                    "Sample block ended at {} after {} samples",
                    control.time, self.block_samples
                );
            }
            ControlKind::EndEvents => {
                self.in_event_block = false;
                debug!("Event block ended at {} after {} events", control.time, self.block_events);
            }
            ControlKind::DataLost => debug!("Tracker reported lost data at {}", control.time),
        }
    }

    // Samples and events started together belong to one block.
    fn begin_block(&mut self) {
        if !self.in_sample_block && !self.in_event_block {
            self.block_number += 1;
        }
    }

    fn apply_sample(&mut self, sample: &IntSample) {
        self.block_samples += 1;
        for eye in Eye::BOTH {
            if sample.has_eye(eye) {
                *self.seen_eyes.get_mut(eye) = true;
                if sample.has(sc::PUPIL_SIZE) {
                    *self.last_pupil_size.get_mut(eye) = Some(*sample.pupil_size.get(eye));
                }
            }
        }
        if sample.has(sc::GAZE_RES) {
            self.last_resolution = Some(sample.resolution);
        }
        if sample.has(sc::STATUS) {
            self.last_status = Some(sample.status);
        }
    }

    /// Negotiated sample content of the current sample block.
    pub fn sample_content_flags(&self) -> Flags {
        self.sample_header.map_or(Flags::EMPTY, |h| h.sample_data)
    }

    /// Negotiated event content of the current event block.
    pub fn event_content_flags(&self) -> Flags {
        self.event_header.map_or(Flags::EMPTY, |h| h.event_data)
    }

    /// Event types announced for the event block, plus every type seen.
    pub fn event_type_flags(&self) -> Flags {
        if !self.started {
            return Flags::EMPTY;
        }
        self.event_header.map_or(Flags::EMPTY, |h| h.event_types) | self.seen_event_types
    }

    /// Which eyes are being tracked, from block headers and observed data.
    pub fn eye_available(&self) -> Option<EyeAvailability> {
        if !self.started {
            return None;
        }
        let announced = |eye: Eye| {
            self.sample_content_flags().has_flag(eye.content_flag())
                || self.event_type_flags().has_flag(eye.event_type_flag())
        };
        EyeAvailability::from_presence(
            self.seen_eyes.left || announced(Eye::Left),
            self.seen_eyes.right || announced(Eye::Right),
        )
    }

    pub fn is_eye_available(&self, eye: Eye) -> bool {
        self.eye_available().is_some_and(|available| available.includes(eye))
    }

    pub fn in_sample_block(&self) -> bool {
        self.in_sample_block
    }

    pub fn in_event_block(&self) -> bool {
        self.in_event_block
    }

    /// True when every requested class is inside a block. Asking for
    /// neither class is always false.
    pub fn in_data_block(&self, samples: bool, events: bool) -> bool {
        if !samples && !events {
            return false;
        }
        (!samples || self.in_sample_block) && (!events || self.in_event_block)
    }

    /// Prescalers for samples of the current sample block.
    pub fn sample_prescalers(&self) -> Prescalers {
        self.sample_header.map_or(self.default_prescalers, |h| h.prescalers)
    }

    /// Prescalers for events of the current event block.
    pub fn event_prescalers(&self) -> Prescalers {
        self.event_header.map_or(self.default_prescalers, |h| h.prescalers)
    }

    /// Prescalers that apply to `record`.
    pub fn prescalers_for(&self, record: &Record) -> Prescalers {
        match record {
            Record::Sample(_) => self.sample_prescalers(),
            _ => self.event_prescalers(),
        }
    }

    pub fn sample_rate(&self) -> Option<u16> {
        self.sample_header.map(|h| h.sample_rate)
    }

    /// Status word of the last delivered sample that carried one.
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Gap flags reported with the last delivered record.
    pub fn last_gaps(&self) -> GapFlags {
        self.last_gaps
    }

    pub fn block_number(&self) -> u32 {
        self.block_number
    }

    pub fn block_sample_count(&self) -> u64 {
        self.block_samples
    }

    pub fn block_event_count(&self) -> u64 {
        self.block_events
    }

    /// Fill fields the tracker elided as constant with the last values seen.
    ///
    /// Resolution, pupil size and status are restored (and flagged present)
    /// only when the sample lacks them and a value for every eye it carries
    /// is known.
    pub fn restore_elided(&self, sample: &IntSample) -> IntSample {
        let mut restored = sample.clone();
        if !sample.has(sc::GAZE_RES) {
            if let Some(resolution) = self.last_resolution {
                restored.resolution = resolution;
                restored.content |= Flags(sc::GAZE_RES);
            }
        }
        if !sample.has(sc::PUPIL_SIZE) {
            let eyes: Vec<Eye> = Eye::BOTH.into_iter().filter(|e| sample.has_eye(*e)).collect();
            if !eyes.is_empty() && eyes.iter().all(|e| self.last_pupil_size.get(*e).is_some()) {
                for eye in eyes {
                    if let Some(size) = *self.last_pupil_size.get(eye) {
                        *restored.pupil_size.get_mut(eye) = size;
                    }
                }
                restored.content |= Flags(sc::PUPIL_SIZE);
            }
        }
        if !sample.has(sc::STATUS) {
            if let Some(status) = self.last_status {
                restored.status = status;
                restored.content |= Flags(sc::STATUS);
            }
        }
        restored
    }
}

/// Serializable snapshot of the link status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct LinkStatus {
    pub sample_content: Flags,
    pub event_content: Flags,
    pub event_types: Flags,
    pub eye: Option<EyeAvailability>,
    pub in_sample_block: bool,
    pub in_event_block: bool,
    pub last_gaps: GapFlags,
    /// Corneal reflection lost in the last reported sample status.
    pub reflection_lost: bool,
    /// Head position warning in the last reported sample status.
    pub head_position_warning: bool,
    pub block_number: u32,
    pub block_samples: u64,
    pub block_events: u64,
    pub queued_samples: usize,
    pub queued_events: usize,
    pub queue_size: usize,
    pub queue_free: usize,
    pub stats: LinkStats,
}

/// Running totals since the link was opened or last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct LinkStats {
    pub decoded: u64,
    pub malformed: u64,
    /// Records switched off by the data switch.
    pub filtered: u64,
    pub evicted_samples: u64,
    pub evicted_events: u64,
    pub evicted_controls: u64,
}

impl LinkStats {
    pub fn evicted(&self) -> u64 {
        self.evicted_samples + self.evicted_events + self.evicted_controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{binocular_sample, block_header, block_start, control};
    use crate::types::link_flags::event_types;
    use crate::types::{EventKind, IntEvent};

    fn state() -> LinkState {
        LinkState::new(Prescalers::default())
    }

    #[test]
    fn empty_before_first_control() {
        let mut state = state();
        state.apply(&binocular_sample(1, 10.0, 10.0), GapFlags::NONE);
        let blink = IntEvent::new(2, EventKind::StartBlink, Eye::Left);
        state.apply(&Record::Event(blink), GapFlags::NONE);

        assert_eq!(state.sample_content_flags(), Flags::EMPTY);
        assert_eq!(state.event_type_flags(), Flags::EMPTY);
        assert_eq!(state.eye_available(), None);
        assert!(!state.in_data_block(true, false));
    }

    #[test]
    fn block_framing() {
        let mut state = state();
        state.apply(&block_start(ControlKind::StartSamples, 10), GapFlags::NONE);
        assert!(state.in_data_block(true, false));
        assert!(!state.in_data_block(true, true));
        assert!(!state.in_data_block(false, false));
        assert_eq!(state.sample_content_flags(), block_header().sample_data);
        assert_eq!(state.block_number(), 1);

        state.apply(&block_start(ControlKind::StartEvents, 10), GapFlags::NONE);
        assert!(state.in_data_block(true, true));
        assert_eq!(state.block_number(), 1);

        state.apply(&binocular_sample(11, 1.0, 1.0), GapFlags::NONE);
        state.apply(&binocular_sample(12, 1.0, 1.0), GapFlags::NONE);
        assert_eq!(state.block_sample_count(), 2);

        state.apply(&control(ControlKind::EndSamples, 13), GapFlags::NONE);
        assert!(!state.in_data_block(true, false));
        assert!(state.in_data_block(false, true));

        state.apply(&control(ControlKind::EndEvents, 13), GapFlags::NONE);
        state.apply(&block_start(ControlKind::StartSamples, 20), GapFlags::NONE);
        assert_eq!(state.block_number(), 2);
        assert_eq!(state.block_sample_count(), 0);
    }

    #[test]
    fn event_types_accumulate() {
        let mut state = state();
        state.apply(&control(ControlKind::StartEvents, 0), GapFlags::NONE);
        let saccade = IntEvent::new(1, EventKind::EndSaccade, Eye::Right);
        state.apply(&Record::Event(saccade), GapFlags::NONE);
        let types = state.event_type_flags();
        assert!(types.has_flag(event_types::SACCADE));
        assert!(types.has_flag(event_types::RIGHT_EYE));
        assert!(!types.has_flag(event_types::BLINK));
        assert_eq!(state.eye_available(), Some(EyeAvailability::Right));
        assert_eq!(state.block_event_count(), 1);
    }

    #[test]
    fn eyes_from_header_and_data() {
        let mut state = state();
        state.apply(&control(ControlKind::StartSamples, 0), GapFlags::NONE);
        assert_eq!(state.eye_available(), None);

        let mut left = IntSample::new(1);
        left.content = Flags(sc::TIMESTAMP | sc::LEFT);
        state.apply(&Record::Sample(left), GapFlags::NONE);
        assert_eq!(state.eye_available(), Some(EyeAvailability::Left));
        assert!(!state.is_eye_available(Eye::Right));

        state.apply(&block_start(ControlKind::StartSamples, 2), GapFlags::NONE);
        assert_eq!(state.eye_available(), Some(EyeAvailability::Binocular));
    }

    #[test]
    fn gaps_belong_to_last_item() {
        let mut state = state();
        state.apply(&binocular_sample(1, 0.0, 0.0), GapFlags::SAMPLE | GapFlags::CONTROL);
        assert!(state.last_gaps().controls_dropped());

        state.apply_dropped(&block_start(ControlKind::StartSamples, 2));
        assert!(state.in_sample_block());
        assert_eq!(state.last_gaps(), GapFlags::SAMPLE | GapFlags::CONTROL);

        // Dropped data records leave counters alone.
        state.apply_dropped(&binocular_sample(3, 0.0, 0.0));
        assert_eq!(state.block_sample_count(), 0);

        state.apply(&binocular_sample(4, 0.0, 0.0), GapFlags::NONE);
        assert!(state.last_gaps().is_empty());
    }

    #[test]
    fn elided_fields_are_restored() {
        let mut state = state();
        state.apply(&binocular_sample(1, 100.0, 100.0), GapFlags::NONE);

        let mut bare = IntSample::new(2);
        bare.content = Flags(sc::TIMESTAMP | sc::LEFT | sc::GAZE_XY);
        let restored = state.restore_elided(&bare);
        assert!(restored.has(sc::GAZE_RES | sc::PUPIL_SIZE | sc::STATUS));
        assert_eq!(restored.resolution, XY::new(352, 340));
        assert_eq!(restored.pupil_size.left, 1150);

        // Nothing known yet: nothing restored.
        let fresh = LinkState::new(Prescalers::default());
        assert_eq!(fresh.restore_elided(&bare), bare);
    }

    #[test]
    fn prescalers_follow_headers() {
        let mut state = LinkState::new(Prescalers { position: 1, ..Prescalers::default() });
        assert_eq!(state.sample_prescalers().position, 1);

        let mut header = block_header();
        header.prescalers.position = 100;
        let start = Record::Control(ControlRecord {
            time: 0,
            kind: ControlKind::StartSamples,
            header: Some(header),
        });
        state.apply(&start, GapFlags::NONE);
        assert_eq!(state.sample_prescalers().position, 100);
        assert_eq!(state.event_prescalers().position, 1);
        assert_eq!(state.sample_rate(), Some(500));
    }

    #[test]
    fn headerless_start_keeps_configured_prescalers() {
        let configured = Prescalers { position: 1, resolution: 5, ..Prescalers::default() };
        let mut state = LinkState::new(configured);
        state.apply(&control(ControlKind::StartSamples, 0), GapFlags::NONE);
        state.apply(&control(ControlKind::StartEvents, 0), GapFlags::NONE);

        assert!(state.in_data_block(true, true));
        assert_eq!(state.sample_prescalers(), configured);
        assert_eq!(state.event_prescalers(), configured);
    }
}
