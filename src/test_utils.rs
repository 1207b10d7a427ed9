//! Record and packet builders shared by tests and benchmarks
//!
//! Fixtures here are synthetic: every builder produces records whose
//! untransmitted fields hold the missing sentinel, exactly as the decoder
//! would, so they survive an encode/decode pass unchanged.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::link_flags::{event_types, sample_content as sc};
use crate::types::{
    BlockHeader, ControlKind, ControlRecord, EyePair, FloatSample, FloatSampleOf, Flags,
    IntSample, MessageRecord, Prescalers, Record, XY,
};
use crate::wire;

/// Content flags used by [`binocular_sample`].
pub const BINOCULAR_CONTENT: u16 = sc::TIMESTAMP
    | sc::LEFT
    | sc::RIGHT
    | sc::GAZE_XY
    | sc::GAZE_RES
    | sc::PUPIL_SIZE
    | sc::STATUS;

/// Float sample with gaze for the eyes given, a steady y of 300 px and an
/// open pupil. An eye passed as `None` is absent from the sample.
pub fn float_sample(time: u32, left_x: Option<f32>, right_x: Option<f32>) -> FloatSample {
    let mut content = Flags(sc::TIMESTAMP | sc::GAZE_XY | sc::PUPIL_SIZE);
    if left_x.is_some() {
        content |= Flags(sc::LEFT);
    }
    if right_x.is_some() {
        content |= Flags(sc::RIGHT);
    }
    let gaze = |x: Option<f32>| XY::new(x, x.map(|_| 300.0));
    let pupil = |x: Option<f32>| x.map(|_| 1000.0);

    FloatSampleOf {
        time,
        content,
        pupil: EyePair::both(XY::new(None, None)),
        href: EyePair::both(XY::new(None, None)),
        gaze: EyePair::new(gaze(left_x), gaze(right_x)),
        resolution: XY::new(None, None),
        pupil_size: EyePair::new(pupil(left_x), pupil(right_x)),
        status: None,
        input: None,
        buttons: None,
        head: None,
    }
}

/// Binocular sample record with both eyes at `(x, y)` pixels.
pub fn binocular_sample(time: u32, x: f32, y: f32) -> Record {
    let mut sample = IntSample::new(time);
    let prescalers = Prescalers::default();
    sample.content = Flags(BINOCULAR_CONTENT);
    let gaze = XY::new(
        crate::types::fixed::from_float(x, prescalers.position),
        crate::types::fixed::from_float(y, prescalers.position),
    );
    sample.gaze = EyePair::both(gaze);
    sample.resolution = XY::new(352, 340);
    sample.pupil_size = EyePair::both(1150);
    Record::Sample(sample)
}

/// Monocular left-eye samples with gaze x advancing `step` pixels per sample.
pub fn left_eye_run(start: u32, count: u32, spacing: u32, step: f32) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let float = float_sample(start + i * spacing, Some(i as f32 * step), None);
            Record::Sample(float.to_int(&Prescalers::default()))
        })
        .collect()
}

/// Header announcing binocular samples and the usual event set.
pub fn block_header() -> BlockHeader {
    BlockHeader {
        sample_data: Flags(BINOCULAR_CONTENT),
        event_data: Flags(0x4400),
        event_types: Flags(
            event_types::LEFT_EYE
                | event_types::RIGHT_EYE
                | event_types::FIXATION
                | event_types::SACCADE
                | event_types::BLINK
                | event_types::MESSAGE,
        ),
        prescalers: Prescalers::default(),
        sample_rate: 500,
    }
}

/// Block start control record carrying [`block_header`].
pub fn block_start(kind: ControlKind, time: u32) -> Record {
    Record::Control(ControlRecord { time, kind, header: Some(block_header()) })
}

/// Control record without a header (block end or data lost).
pub fn control(kind: ControlKind, time: u32) -> Record {
    Record::Control(ControlRecord { time, kind, header: None })
}

pub fn message(time: u32, text: &str) -> Record {
    Record::Message(MessageRecord { time, payload: text.as_bytes().to_vec() })
}

/// Encode fixture records into packets.
pub fn packets(records: &[Record]) -> Vec<Vec<u8>> {
    records
        .iter()
        .map(|record| wire::encode(record).expect("fixture records are encodable"))
        .collect()
}

/// A complete recording: both blocks start, `samples` binocular samples at
/// 2 ms spacing with a fixation in the middle, both blocks end.
pub fn recording_session(samples: u32) -> Vec<Record> {
    use crate::types::{Eye, EventKind, IntEvent};

    let mut records = vec![
        block_start(ControlKind::StartSamples, 0),
        block_start(ControlKind::StartEvents, 0),
        message(1, "TRIALID 1"),
    ];
    for i in 0..samples {
        let time = 2 + i * 2;
        records.push(binocular_sample(time, 512.0 + i as f32, 384.0));
        if i == samples / 2 {
            records.push(Record::Event(IntEvent::new(time, EventKind::StartFixation, Eye::Left)));
        }
    }
    let end = 2 + samples * 2;
    records.push(control(ControlKind::EndSamples, end));
    records.push(control(ControlKind::EndEvents, end));
    records
}
