//! Packet decoding

use tracing::trace;

use crate::types::link_flags::{event_read as rd, sample_content as sc};
use crate::types::{
    BlockHeader, ControlKind, ControlRecord, EventKind, Eye, EyePair, Flags, HeadData, IntEvent,
    IntEventPoint, IntSample, IoEvent, IoKind, MAX_HEAD_CHANNELS, MAX_MESSAGE_LEN, MessageRecord,
    Prescalers, Record, RecordKind, XY,
};
use crate::{LinkError, Result};

/// Little-endian cursor over one packet.
pub(crate) struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
    context: &'static str,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0, context: "record header" }
    }

    fn section(&mut self, context: &'static str) {
        self.context = context;
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.offset;
        if len > remaining {
            return Err(LinkError::malformed(
                self.context,
                format!(
                    "Insufficient data at offset {} (need {} bytes, have {})",
                    self.offset, len, remaining
                ),
            ));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn xy(&mut self) -> Result<XY<i16>> {
        Ok(XY::new(self.i16()?, self.i16()?))
    }

    fn flags(&mut self) -> Result<Flags> {
        Ok(Flags(self.u16()?))
    }

    fn finish(self) -> Result<()> {
        let trailing = self.data.len() - self.offset;
        if trailing > 0 {
            return Err(LinkError::malformed(
                self.context,
                format!("{} trailing bytes after offset {}", trailing, self.offset),
            ));
        }
        Ok(())
    }
}

/// Decode one packet into a record.
///
/// The whole packet must be consumed. Truncation, trailing bytes, unknown type
/// codes and out-of-range fields are reported as errors and the caller drops
/// the packet.
pub fn decode(packet: &[u8]) -> Result<Record> {
    let mut reader = WireReader::new(packet);
    let code = reader.u8()?;
    let time = reader.u32()?;
    let kind = RecordKind::from_code(code).ok_or(LinkError::UnknownRecordType { code })?;

    let record = match kind {
        RecordKind::Sample => Record::Sample(read_sample(&mut reader, time)?),
        RecordKind::StartBlink
        | RecordKind::EndBlink
        | RecordKind::StartSaccade
        | RecordKind::EndSaccade
        | RecordKind::StartFixation
        | RecordKind::EndFixation
        | RecordKind::FixationUpdate => Record::Event(read_event(&mut reader, time, code)?),
        RecordKind::Message => {
            reader.section("message body");
            let len = usize::from(reader.u16()?);
            if len > MAX_MESSAGE_LEN {
                return Err(LinkError::malformed(
                    "message body",
                    format!("length {} exceeds {}", len, MAX_MESSAGE_LEN),
                ));
            }
            let payload = reader.take(len)?.to_vec();
            Record::Message(MessageRecord { time, payload })
        }
        RecordKind::Button | RecordKind::Input => {
            reader.section("io body");
            let kind = if kind == RecordKind::Button { IoKind::Button } else { IoKind::Input };
            Record::Io(IoEvent { time, kind, data: reader.u16()? })
        }
        RecordKind::StartSamples | RecordKind::StartEvents => {
            let header = read_block_header(&mut reader)?;
            let kind = if kind == RecordKind::StartSamples {
                ControlKind::StartSamples
            } else {
                ControlKind::StartEvents
            };
            Record::Control(ControlRecord { time, kind, header: Some(header) })
        }
        RecordKind::EndSamples => control(time, ControlKind::EndSamples),
        RecordKind::EndEvents => control(time, ControlKind::EndEvents),
        RecordKind::DataLost => control(time, ControlKind::DataLost),
    };

    reader.finish()?;
    trace!("Decoded {:?} at {} ({} bytes)", kind, time, packet.len());
    Ok(record)
}

fn control(time: u32, kind: ControlKind) -> Record {
    Record::Control(ControlRecord { time, kind, header: None })
}

fn read_sample(r: &mut WireReader<'_>, time: u32) -> Result<IntSample> {
    r.section("sample body");
    let mut sample = IntSample::new(time);
    sample.content = r.flags()?;
    let eyes: Vec<Eye> = Eye::BOTH.into_iter().filter(|eye| sample.has_eye(*eye)).collect();

    if sample.has(sc::PUPIL_XY) {
        read_pairs(r, &eyes, &mut sample.pupil)?;
    }
    if sample.has(sc::HREF_XY) {
        read_pairs(r, &eyes, &mut sample.href)?;
    }
    if sample.has(sc::GAZE_XY) {
        read_pairs(r, &eyes, &mut sample.gaze)?;
    }
    if sample.has(sc::GAZE_RES) {
        sample.resolution = r.xy()?;
    }
    if sample.has(sc::PUPIL_SIZE) {
        for eye in &eyes {
            *sample.pupil_size.get_mut(*eye) = r.u16()?;
        }
    }
    if sample.has(sc::STATUS) {
        sample.status = r.u16()?;
    }
    if sample.has(sc::INPUTS) {
        sample.input = r.u16()?;
    }
    if sample.has(sc::BUTTONS) {
        sample.buttons = r.u16()?;
    }
    if sample.has(sc::HEAD_POS) {
        r.section("sample head data");
        let kind = r.i16()?;
        let count = usize::from(r.u8()?);
        if count > MAX_HEAD_CHANNELS {
            return Err(LinkError::malformed(
                "sample head data",
                format!("{} channels exceeds {}", count, MAX_HEAD_CHANNELS),
            ));
        }
        let channels = (0..count).map(|_| r.i16()).collect::<Result<Vec<_>>>()?;
        sample.head = HeadData { kind, channels };
    }
    Ok(sample)
}

fn read_pairs(r: &mut WireReader<'_>, eyes: &[Eye], pairs: &mut EyePair<XY<i16>>) -> Result<()> {
    for eye in eyes {
        *pairs.get_mut(*eye) = r.xy()?;
    }
    Ok(())
}

fn read_event(r: &mut WireReader<'_>, time: u32, code: u8) -> Result<IntEvent> {
    r.section("event body");
    let kind = EventKind::from_code(code).ok_or(LinkError::UnknownRecordType { code })?;
    let eye_code = r.u8()?;
    let eye = Eye::from_code(eye_code)
        .ok_or_else(|| LinkError::malformed("event body", format!("bad eye code {}", eye_code)))?;

    let mut event = IntEvent::new(time, kind, eye);
    event.read = r.flags()?;
    event.start_time = r.u32()?;
    if event.has(rd::END_TIME) {
        event.end_time = r.u32()?;
    }

    let parts = [rd::BEG, rd::END, rd::AVG];
    let has_href = event.has(rd::HREF_XY | rd::PUPIL_XY);
    let has_gaze = event.has(rd::GAZE_XY);
    for part in parts {
        if !event.has(part) {
            continue;
        }
        let mut point = IntEventPoint::default();
        if has_href {
            point.href = r.xy()?;
        }
        if has_gaze {
            point.gaze = r.xy()?;
        }
        *event_point(&mut event, part) = point;
    }
    if event.has(rd::SIZE) {
        for part in parts {
            if event.has(part) {
                event_point(&mut event, part).pupil_size = r.u16()?;
            }
        }
    }
    if event.has(rd::VEL) {
        if event.has(rd::BEG) {
            event.start_velocity = r.i16()?;
        }
        if event.has(rd::END) {
            event.end_velocity = r.i16()?;
        }
        if event.has(rd::AVG) {
            event.average_velocity = r.i16()?;
            event.peak_velocity = r.i16()?;
        }
    }
    if event.has(rd::GRES) {
        if event.has(rd::BEG) {
            event.start_resolution = r.xy()?;
        }
        if event.has(rd::END) {
            event.end_resolution = r.xy()?;
        }
    }
    if event.has(rd::STATUS) {
        event.status = r.u16()?;
    }
    Ok(event)
}

fn event_point(event: &mut IntEvent, part: u16) -> &mut IntEventPoint {
    match part {
        rd::BEG => &mut event.start,
        rd::END => &mut event.end,
        _ => &mut event.average,
    }
}

fn read_block_header(r: &mut WireReader<'_>) -> Result<BlockHeader> {
    r.section("block header");
    let sample_data = r.flags()?;
    let event_data = r.flags()?;
    let event_types = r.flags()?;
    let prescalers = Prescalers {
        position: r.u16()?,
        resolution: r.u16()?,
        velocity: r.u16()?,
        pupil: r.u16()?,
    };
    prescalers.validate().map_err(|e| LinkError::malformed("block header", e.to_string()))?;
    let sample_rate = r.u16()?;
    Ok(BlockHeader { sample_data, event_data, event_types, prescalers, sample_rate })
}
