//! Packet encoding, the inverse of [`decode`](super::decode).
//!
//! Used by replay sources, test fixtures and to size records that enter the
//! link without a packet.

use crate::types::link_flags::{event_read as rd, sample_content as sc};
use crate::types::{
    BlockHeader, Eye, EyePair, IntEvent, IntEventPoint, IntSample, MAX_HEAD_CHANNELS,
    MAX_MESSAGE_LEN, Record, XY,
};
use crate::{LinkError, Result};

#[derive(Default)]
struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn xy(&mut self, value: XY<i16>) {
        self.i16(value.x);
        self.i16(value.y);
    }
}

/// Encode a record into one packet.
///
/// Fails for records the wire cannot carry: messages longer than 255 bytes,
/// more than eight head channels, or a block header with a zero prescaler.
pub fn encode(record: &Record) -> Result<Vec<u8>> {
    let mut w = WireWriter::default();
    w.u8(record.kind().code());
    w.u32(record.time());

    match record {
        Record::Sample(sample) => write_sample(&mut w, sample)?,
        Record::Event(event) => write_event(&mut w, event),
        Record::Message(message) => {
            if message.payload.len() > MAX_MESSAGE_LEN {
                return Err(LinkError::malformed(
                    "message body",
                    format!("length {} exceeds {}", message.payload.len(), MAX_MESSAGE_LEN),
                ));
            }
            w.u16(message.payload.len() as u16);
            w.buf.extend_from_slice(&message.payload);
        }
        Record::Io(io) => w.u16(io.data),
        Record::Control(control) => {
            if control.kind.is_block_start() {
                write_block_header(&mut w, &control.header.unwrap_or_default())?;
            }
        }
    }
    Ok(w.buf)
}

/// Size in bytes of the packet carrying `record`.
pub fn encoded_len(record: &Record) -> Result<usize> {
    encode(record).map(|packet| packet.len())
}

fn write_sample(w: &mut WireWriter, sample: &IntSample) -> Result<()> {
    w.u16(sample.content.value());
    let eyes: Vec<Eye> = Eye::BOTH.into_iter().filter(|eye| sample.has_eye(*eye)).collect();
    let write_pairs = |w: &mut WireWriter, pairs: &EyePair<XY<i16>>| {
        for eye in &eyes {
            w.xy(*pairs.get(*eye));
        }
    };

    if sample.has(sc::PUPIL_XY) {
        write_pairs(w, &sample.pupil);
    }
    if sample.has(sc::HREF_XY) {
        write_pairs(w, &sample.href);
    }
    if sample.has(sc::GAZE_XY) {
        write_pairs(w, &sample.gaze);
    }
    if sample.has(sc::GAZE_RES) {
        w.xy(sample.resolution);
    }
    if sample.has(sc::PUPIL_SIZE) {
        for eye in &eyes {
            w.u16(*sample.pupil_size.get(*eye));
        }
    }
    if sample.has(sc::STATUS) {
        w.u16(sample.status);
    }
    if sample.has(sc::INPUTS) {
        w.u16(sample.input);
    }
    if sample.has(sc::BUTTONS) {
        w.u16(sample.buttons);
    }
    if sample.has(sc::HEAD_POS) {
        let count = sample.head.channels.len();
        if count > MAX_HEAD_CHANNELS {
            return Err(LinkError::malformed(
                "sample head data",
                format!("{} channels exceeds {}", count, MAX_HEAD_CHANNELS),
            ));
        }
        w.i16(sample.head.kind);
        w.u8(count as u8);
        for channel in &sample.head.channels {
            w.i16(*channel);
        }
    }
    Ok(())
}

fn write_event(w: &mut WireWriter, event: &IntEvent) {
    w.u8(event.eye.code());
    w.u16(event.read.value());
    w.u32(event.start_time);
    if event.has(rd::END_TIME) {
        w.u32(event.end_time);
    }

    let parts: [(u16, &IntEventPoint); 3] =
        [(rd::BEG, &event.start), (rd::END, &event.end), (rd::AVG, &event.average)];
    for (part, point) in parts {
        if !event.has(part) {
            continue;
        }
        if event.has(rd::HREF_XY | rd::PUPIL_XY) {
            w.xy(point.href);
        }
        if event.has(rd::GAZE_XY) {
            w.xy(point.gaze);
        }
    }
    if event.has(rd::SIZE) {
        for (part, point) in parts {
            if event.has(part) {
                w.u16(point.pupil_size);
            }
        }
    }
    if event.has(rd::VEL) {
        if event.has(rd::BEG) {
            w.i16(event.start_velocity);
        }
        if event.has(rd::END) {
            w.i16(event.end_velocity);
        }
        if event.has(rd::AVG) {
            w.i16(event.average_velocity);
            w.i16(event.peak_velocity);
        }
    }
    if event.has(rd::GRES) {
        if event.has(rd::BEG) {
            w.xy(event.start_resolution);
        }
        if event.has(rd::END) {
            w.xy(event.end_resolution);
        }
    }
    if event.has(rd::STATUS) {
        w.u16(event.status);
    }
}

fn write_block_header(w: &mut WireWriter, header: &BlockHeader) -> Result<()> {
    header.prescalers.validate()?;
    w.u16(header.sample_data.value());
    w.u16(header.event_data.value());
    w.u16(header.event_types.value());
    w.u16(header.prescalers.position);
    w.u16(header.prescalers.resolution);
    w.u16(header.prescalers.velocity);
    w.u16(header.prescalers.pupil);
    w.u16(header.sample_rate);
    Ok(())
}
