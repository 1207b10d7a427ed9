//! Link core: decoded records flowing into the queue, the state tracker and
//! the kinematic history.
//!
//! ```text
//! packet ─► decode ─► data switch ─► RecordQueue ─► next() ─► LinkState::apply
//!                          │             │    │
//!                  samples ▼             │    └─► latest slots (any, per class)
//!                    SampleWindow        ▼
//!                            evicted controls ─► LinkState::apply_dropped
//! ```
//!
//! The producer side ([`LinkCore::ingest`]) feeds the queue, the latest slots
//! and the kinematic window. The consumer side ([`LinkCore::next`]) drains the
//! queue and is the only path that updates the [`LinkState`], so block
//! framing queries describe what the application has consumed.
//!
//! [`LinkShared`] puts a core behind a lock with an arrival notifier so one
//! producer task and any number of readers can share it.

mod queue;
mod state;

pub use queue::{Delivered, LatestSlot, RecordQueue};
pub use state::{LinkState, LinkStats, LinkStatus};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::kinematics::{self, KinematicEstimate, SampleWindow, VelocityModel};
use crate::types::{
    self, ControlKind, FloatRecord, FloatSample, GapFlags, Prescalers, Record, RecordClass,
};
use crate::wire;

/// Single-writer link state machine.
#[derive(Debug)]
pub struct LinkCore {
    default_prescalers: Prescalers,
    state: LinkState,
    queue: RecordQueue,
    window: SampleWindow,
    ingest_prescalers: Prescalers,
    samples_on: bool,
    events_on: bool,
    last_delivered: Option<Delivered>,
    stats: LinkStats,
}

impl LinkCore {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            default_prescalers: config.prescalers,
            state: LinkState::new(config.prescalers),
            queue: RecordQueue::new(config.queue_capacity),
            window: SampleWindow::new(config.history_len),
            ingest_prescalers: config.prescalers,
            samples_on: config.samples_on,
            events_on: config.events_on,
            last_delivered: None,
            stats: LinkStats::default(),
        }
    }

    /// Decode and take in one packet. Malformed packets are counted, logged
    /// and dropped; the kinematic history treats them as a gap.
    ///
    /// Returns whether the packet produced a queued record.
    pub fn ingest(&mut self, packet: &[u8]) -> bool {
        match wire::decode(packet) {
            Ok(record) => self.ingest_sized(record, packet.len()),
            Err(e) => {
                self.stats.malformed += 1;
                self.window.mark_gap();
                warn!("Dropping malformed packet ({} bytes): {}", packet.len(), e);
                false
            }
        }
    }

    /// Take in an already decoded record, charged at its encoded size.
    pub fn ingest_record(&mut self, record: Record) -> bool {
        match wire::encoded_len(&record) {
            Ok(size) => self.ingest_sized(record, size),
            Err(e) => {
                self.stats.decoded += 1;
                self.stats.malformed += 1;
                warn!("Dropping record the link cannot carry: {}", e);
                false
            }
        }
    }

    fn ingest_sized(&mut self, record: Record, size: usize) -> bool {
        self.stats.decoded += 1;

        let switched_off = match record {
            Record::Sample(_) => !self.samples_on,
            Record::Event(_) => !self.events_on,
            _ => false,
        };
        if switched_off {
            self.stats.filtered += 1;
            trace!("Filtered {:?} at {}", record.kind(), record.time());
            return false;
        }

        match &record {
            Record::Sample(sample) => self.window.push(sample.to_float(&self.ingest_prescalers)),
            Record::Control(control) => match control.kind {
                ControlKind::StartSamples => {
                    self.ingest_prescalers =
                        control.header.map_or(self.default_prescalers, |h| h.prescalers);
                    self.window.mark_gap();
                }
                ControlKind::DataLost => self.window.mark_gap(),
                _ => {}
            },
            _ => {}
        }

        let fits = size <= self.queue.capacity();
        let evicted = self.queue.push(Arc::new(record), size);
        for lost in &evicted {
            match lost.class() {
                RecordClass::Sample => self.stats.evicted_samples += 1,
                RecordClass::Event => self.stats.evicted_events += 1,
                RecordClass::Control => self.stats.evicted_controls += 1,
            }
            self.state.apply_dropped(lost);
        }
        fits
    }

    /// Deliver the oldest record, applying it to the link state.
    ///
    /// Records that report lost data upstream carry sample and event gap
    /// flags themselves.
    pub fn next(&mut self) -> Option<Delivered> {
        let mut delivered = self.queue.pop_oldest()?;
        if let Record::Control(control) = delivered.record.as_ref() {
            if control.kind == ControlKind::DataLost {
                delivered.gaps |= GapFlags::SAMPLE | GapFlags::EVENT;
            }
        }
        self.state.apply(&delivered.record, delivered.gaps);
        trace!(
            "Delivered {:?} at {} (gaps {:#06x})",
            delivered.record.kind(),
            delivered.record.time(),
            delivered.gaps.value()
        );
        self.last_delivered = Some(delivered.clone());
        Some(delivered)
    }

    /// Deliver the next sample, discarding anything queued before it. Gaps of
    /// discarded records are merged into the sample's.
    pub fn next_sample(&mut self) -> Option<Delivered> {
        let mut gaps = GapFlags::NONE;
        while let Some(mut delivered) = self.next() {
            gaps |= delivered.gaps;
            if delivered.record.class() == RecordClass::Sample {
                delivered.gaps = gaps;
                return Some(delivered);
            }
        }
        None
    }

    /// Next record with samples and events converted with the prescalers of
    /// their block.
    pub fn next_float(&mut self) -> Option<(FloatRecord, GapFlags)> {
        let delivered = self.next()?;
        let prescalers = self.state.prescalers_for(&delivered.record);
        Some((delivered.record.to_float(&prescalers), delivered.gaps))
    }

    /// The record most recently delivered by [`next`](Self::next).
    pub fn last_delivered(&self) -> Option<&Delivered> {
        self.last_delivered.as_ref()
    }

    /// Consume queued records until every requested class is inside a block.
    ///
    /// Returns false when the queue runs dry first. Everything consumed on the
    /// way is discarded.
    pub fn advance_to_block_start(&mut self, samples: bool, events: bool) -> bool {
        if !samples && !events {
            return false;
        }
        let mut discarded = 0usize;
        while !self.state.in_data_block(samples, events) {
            let Some(delivered) = self.next() else {
                if discarded > 0 {
                    debug!("Discarded {} records waiting for block start", discarded);
                }
                return false;
            };
            if delivered.record.class() != RecordClass::Control {
                discarded += 1;
            }
        }
        if discarded > 0 {
            debug!("Discarded {} records before block start", discarded);
        }
        true
    }

    pub fn in_data_block(&self, samples: bool, events: bool) -> bool {
        self.state.in_data_block(samples, events)
    }

    /// Queued records of the selected classes.
    pub fn data_count(&self, samples: bool, events: bool) -> usize {
        self.queue.count(samples, events)
    }

    pub fn has_new_latest(&self, class: Option<RecordClass>) -> bool {
        self.queue.has_new_latest(class)
    }

    pub fn peek_latest(&mut self, class: Option<RecordClass>) -> Option<Arc<Record>> {
        self.queue.peek_latest(class)
    }

    /// Newest sample in application units.
    pub fn latest_float_sample(&mut self) -> Option<FloatSample> {
        let prescalers = self.ingest_prescalers;
        let record = self.queue.peek_latest(Some(RecordClass::Sample))?;
        record.as_sample().map(|sample| sample.to_float(&prescalers))
    }

    pub fn subscribe_latest(
        &self,
        class: Option<RecordClass>,
    ) -> tokio::sync::watch::Receiver<Option<Arc<Record>>> {
        self.queue.subscribe_latest(class)
    }

    /// Kinematics of the newest full window of samples.
    pub fn estimate(&self, model: VelocityModel) -> Option<KinematicEstimate> {
        kinematics::estimate(model, &self.window)
    }

    /// Prescalers applying to newly arriving samples.
    pub fn ingest_prescalers(&self) -> Prescalers {
        self.ingest_prescalers
    }

    /// Switch reception of samples and events on or off. Control records,
    /// messages and IO changes are always received.
    pub fn data_switch(&mut self, samples_on: bool, events_on: bool) {
        debug!("Data switch: samples {}, events {}", samples_on, events_on);
        self.samples_on = samples_on;
        self.events_on = events_on;
        if !samples_on {
            self.window.mark_gap();
        }
    }

    /// Start the link state over. With `clear`, queued records, latest slots
    /// and sample history are dropped too.
    pub fn reset(&mut self, clear: bool) {
        info!("Resetting link state (clear queue: {})", clear);
        self.state = LinkState::new(self.default_prescalers);
        self.ingest_prescalers = self.default_prescalers;
        self.stats = LinkStats::default();
        if clear {
            self.queue.clear();
            self.window.clear();
            self.last_delivered = None;
        } else {
            self.window.mark_gap();
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn queue(&self) -> &RecordQueue {
        &self.queue
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn status(&self) -> LinkStatus {
        let status = self.state.last_status();
        LinkStatus {
            sample_content: self.state.sample_content_flags(),
            event_content: self.state.event_content_flags(),
            event_types: self.state.event_type_flags(),
            eye: self.state.eye_available(),
            in_sample_block: self.state.in_sample_block(),
            in_event_block: self.state.in_event_block(),
            last_gaps: self.state.last_gaps(),
            reflection_lost: status.is_some_and(types::corneal_reflection_lost),
            head_position_warning: status.is_some_and(types::head_position_warning),
            block_number: self.state.block_number(),
            block_samples: self.state.block_sample_count(),
            block_events: self.state.block_event_count(),
            queued_samples: self.queue.count(true, false),
            queued_events: self.queue.count(false, true),
            queue_size: self.queue.size(),
            queue_free: self.queue.free(),
            stats: self.stats,
        }
    }
}

/// A [`LinkCore`] shared between the producer and consumers.
#[derive(Debug)]
pub struct LinkShared {
    core: Mutex<LinkCore>,
    arrivals: Notify,
    ended: AtomicBool,
}

impl LinkShared {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            core: Mutex::new(LinkCore::new(config)),
            arrivals: Notify::new(),
            ended: AtomicBool::new(false),
        }
    }

    /// Lock the core. A panic while holding the lock leaves the core usable:
    /// every mutation completes before the lock is released.
    pub fn lock(&self) -> MutexGuard<'_, LinkCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Producer entry point: take in a packet and wake waiters.
    pub fn ingest(&self, packet: &[u8]) -> bool {
        let queued = self.lock().ingest(packet);
        self.arrivals.notify_waiters();
        queued
    }

    pub fn ingest_record(&self, record: Record) -> bool {
        let queued = self.lock().ingest_record(record);
        self.arrivals.notify_waiters();
        queued
    }

    /// Future completing on the next arrival (or end of input).
    pub fn arrival(&self) -> Notified<'_> {
        self.arrivals.notified()
    }

    /// Mark the producer finished.
    pub fn end_of_input(&self) {
        self.ended.store(true, Ordering::Release);
        self.arrivals.notify_waiters();
    }

    /// Whether the producer has finished. Queued records remain readable.
    pub fn input_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }
}
