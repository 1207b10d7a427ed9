//! Replay source over recorded packets

use std::collections::VecDeque;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::source::PacketSource;
use crate::types::{Record, RecordKind};
use crate::{Result, wire};

/// Plays back a fixed list of packets.
///
/// Unpaced by default. With pacing, sample packets are released at the
/// nominal rate times the playback speed, and every other packet goes out
/// immediately after the sample before it.
pub struct ReplaySource {
    packets: VecDeque<Vec<u8>>,
    total: usize,
    nominal_rate: f64,
    paced: bool,
    speed: f64,
    interval: Option<Interval>,
}

impl ReplaySource {
    /// Replay `packets` recorded from a tracker sampling at `nominal_rate` Hz.
    pub fn new(packets: Vec<Vec<u8>>, nominal_rate: f64) -> Self {
        let total = packets.len();
        info!("Replay source with {} packets at {}Hz", total, nominal_rate);
        Self {
            packets: packets.into(),
            total,
            nominal_rate: nominal_rate.max(1.0),
            paced: false,
            speed: 1.0,
            interval: None,
        }
    }

    /// Encode records and replay them.
    pub fn from_records(records: &[Record], nominal_rate: f64) -> Result<Self> {
        let packets = records.iter().map(wire::encode).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(packets, nominal_rate))
    }

    /// Release samples in real time.
    pub fn paced(mut self) -> Self {
        self.paced = true;
        self.interval = None;
        self
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
        // Rebuilt at the new period on the next paced packet.
        self.interval = None;
        debug!("Playback speed set to {}x", self.speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Packets already handed out.
    pub fn position(&self) -> usize {
        self.total - self.packets.len()
    }

    pub fn remaining(&self) -> usize {
        self.packets.len()
    }

    fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / (self.nominal_rate * self.speed))
    }
}

#[async_trait::async_trait]
impl PacketSource for ReplaySource {
    async fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(packet) = self.packets.pop_front() else {
            debug!("Reached end of replay");
            return Ok(None);
        };

        let is_sample = packet.first() == Some(&RecordKind::Sample.code());
        if self.paced && is_sample {
            let period = self.period();
            let pacing = self.interval.get_or_insert_with(|| {
                let mut pacing = interval(period);
                pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
                pacing
            });
            pacing.tick().await;
        }

        trace!("Packet {}/{} ({} bytes)", self.position(), self.total, packet.len());
        Ok(Some(packet))
    }

    fn nominal_rate(&self) -> f64 {
        self.nominal_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{binocular_sample, message};

    #[tokio::test]
    async fn plays_every_packet_then_ends() {
        let records = vec![binocular_sample(1, 0.0, 0.0), message(2, "x")];
        let mut source = ReplaySource::from_records(&records, 500.0).unwrap();
        assert_eq!(source.remaining(), 2);

        for record in &records {
            let packet = source.next_packet().await.unwrap().unwrap();
            assert_eq!(&wire::decode(&packet).unwrap(), record);
        }
        assert!(source.next_packet().await.unwrap().is_none());
        assert_eq!(source.position(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_follows_rate_and_speed() {
        let records: Vec<Record> = (0..11).map(|t| binocular_sample(t * 10, 0.0, 0.0)).collect();
        let mut source = ReplaySource::from_records(&records, 100.0).unwrap().paced();
        source.set_speed(2.0);

        let started = tokio::time::Instant::now();
        while source.next_packet().await.unwrap().is_some() {}
        // First tick is immediate, then ten periods of 5 ms.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(55), "{elapsed:?}");
    }

    #[test]
    fn speed_is_clamped() {
        let mut source = ReplaySource::new(Vec::new(), 1000.0);
        source.set_speed(100.0);
        assert_eq!(source.speed(), 10.0);
        source.set_speed(0.0);
        assert_eq!(source.speed(), 0.1);
    }
}
