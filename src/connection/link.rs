//! Application-facing link connection

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::driver::Driver;
use crate::framing::{self, WaitParams};
use crate::kinematics::{KinematicEstimate, VelocityModel};
use crate::link::{Delivered, LinkShared, LinkStats, LinkStatus};
use crate::source::PacketSource;
use crate::stream::RateLimitExt;
use crate::types::{
    Eye, EyeAvailability, EyePair, Flags, FloatRecord, FloatSample, GapFlags, IntSample,
    Record, RecordClass, UpdateRate, XY,
};
use crate::Result;

/// Fallback sample rate before any block header has been seen.
const DEFAULT_SOURCE_HZ: f64 = 1000.0;

/// A live or replayed link to an eye tracker.
///
/// Reading methods take `&self` and may be called from any task. Records
/// enter either through a driver task spawned by [`open`](Self::open) or
/// through [`ingest`](Self::ingest) from a single producer.
pub struct LinkConnection {
    shared: Arc<LinkShared>,
    config: LinkConfig,
    source_hz: Option<f64>,
    brk: Mutex<CancellationToken>,
    driver: Option<CancellationToken>,
}

impl LinkConnection {
    /// Connection without a driver; the caller ingests packets itself.
    pub fn new(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Link opened (queue {} bytes, history {} samples)",
            config.queue_capacity, config.history_len
        );
        Ok(Self {
            shared: Arc::new(LinkShared::new(&config)),
            config,
            source_hz: None,
            brk: Mutex::new(CancellationToken::new()),
            driver: None,
        })
    }

    /// Connection fed by a driver task reading `source`.
    pub fn open<S: PacketSource>(source: S, config: LinkConfig) -> Result<Self> {
        let mut connection = Self::new(config)?;
        let source_hz = source.nominal_rate();
        let max_errors = connection.config.max_source_errors;
        let handle = Driver::spawn(source, Arc::clone(&connection.shared), max_errors);
        connection.source_hz = Some(source_hz);
        connection.driver = Some(handle.cancel);
        info!("Link driver started ({}Hz source)", source_hz);
        Ok(connection)
    }

    // Producer side

    /// Decode and queue one packet. Returns whether it was queued.
    pub fn ingest(&self, packet: &[u8]) -> bool {
        self.shared.ingest(packet)
    }

    pub fn ingest_record(&self, record: Record) -> bool {
        self.shared.ingest_record(record)
    }

    /// Declare that no more packets will be ingested.
    pub fn end_of_input(&self) {
        self.shared.end_of_input();
    }

    pub fn input_ended(&self) -> bool {
        self.shared.input_ended()
    }

    // Ordered path

    /// Oldest queued record, with the gaps that preceded it.
    pub fn next(&self) -> Option<Delivered> {
        self.shared.lock().next()
    }

    /// Next sample, skipping queued events and messages.
    pub fn next_sample(&self) -> Option<Delivered> {
        self.shared.lock().next_sample()
    }

    /// Next record in application units.
    pub fn next_float(&self) -> Option<(FloatRecord, GapFlags)> {
        self.shared.lock().next_float()
    }

    /// The record last returned by the ordered path.
    pub fn last_record(&self) -> Option<Delivered> {
        self.shared.lock().last_delivered().cloned()
    }

    /// Queued records of the selected classes.
    pub fn data_count(&self, samples: bool, events: bool) -> usize {
        self.shared.lock().data_count(samples, events)
    }

    // Latest-value path

    pub fn has_new_record(&self) -> bool {
        self.shared.lock().has_new_latest(None)
    }

    /// Newest record of any class, without consuming the queue.
    pub fn latest_record(&self) -> Option<Arc<Record>> {
        self.shared.lock().peek_latest(None)
    }

    pub fn has_new_sample(&self) -> bool {
        self.shared.lock().has_new_latest(Some(RecordClass::Sample))
    }

    pub fn latest_sample(&self) -> Option<Arc<Record>> {
        self.shared.lock().peek_latest(Some(RecordClass::Sample))
    }

    /// Newest sample in application units.
    pub fn latest_float_sample(&self) -> Option<FloatSample> {
        self.shared.lock().latest_float_sample()
    }

    pub fn has_new_event(&self) -> bool {
        self.shared.lock().has_new_latest(Some(RecordClass::Event))
    }

    pub fn latest_event(&self) -> Option<Arc<Record>> {
        self.shared.lock().peek_latest(Some(RecordClass::Event))
    }

    /// Newest samples as a stream, for gaze-contingent displays.
    ///
    /// With [`UpdateRate::Max`] below the source rate, samples arriving
    /// faster than the limit are skipped in favour of the newest.
    pub fn latest_samples(&self, rate: UpdateRate) -> BoxStream<'static, FloatSample> {
        let receiver = self.shared.lock().subscribe_latest(Some(RecordClass::Sample));
        let shared = Arc::clone(&self.shared);
        let samples = WatchStream::new(receiver).filter_map(move |latest| {
            let prescalers = shared.lock().ingest_prescalers();
            async move {
                let record = latest?;
                record.as_sample().map(|sample| sample.to_float(&prescalers))
            }
        });

        match rate.min_interval(self.source_hz()) {
            None => samples.boxed(),
            Some(period) => samples.rate_limit(period).boxed(),
        }
    }

    // Link state

    pub fn status(&self) -> LinkStatus {
        self.shared.lock().status()
    }

    pub fn stats(&self) -> LinkStats {
        self.shared.lock().stats()
    }

    pub fn sample_content_flags(&self) -> Flags {
        self.shared.lock().state().sample_content_flags()
    }

    pub fn event_content_flags(&self) -> Flags {
        self.shared.lock().state().event_content_flags()
    }

    pub fn event_type_flags(&self) -> Flags {
        self.shared.lock().state().event_type_flags()
    }

    pub fn eye_available(&self) -> Option<EyeAvailability> {
        self.shared.lock().state().eye_available()
    }

    pub fn is_eye_available(&self, eye: Eye) -> bool {
        self.shared.lock().state().is_eye_available(eye)
    }

    pub fn in_data_block(&self, samples: bool, events: bool) -> bool {
        self.shared.lock().in_data_block(samples, events)
    }

    /// Fill fields of `sample` the tracker elided as constant with the last
    /// values delivered on the ordered path.
    pub fn restore_elided(&self, sample: &IntSample) -> IntSample {
        self.shared.lock().state().restore_elided(sample)
    }

    /// Source sample rate: the driver source's, else the current block's.
    pub fn source_hz(&self) -> f64 {
        self.source_hz.unwrap_or_else(|| {
            self.shared.lock().state().sample_rate().map_or(DEFAULT_SOURCE_HZ, f64::from)
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    // Control

    /// Switch reception of samples and events.
    pub fn data_switch(&self, samples_on: bool, events_on: bool) {
        self.shared.lock().data_switch(samples_on, events_on);
    }

    /// Reinitialise the link state; with `clear`, also drop queued data.
    pub fn reset(&self, clear: bool) {
        self.shared.lock().reset(clear);
    }

    // Blocking waits

    /// Wait until every requested class is inside a recording block.
    pub async fn wait_for_block_start(
        &self,
        timeout: Duration,
        samples: bool,
        events: bool,
    ) -> bool {
        let brk = self.break_token();
        let params = self.wait_params(timeout);
        framing::wait_for_block_start(&self.shared, &brk, params, samples, events).await
    }

    /// Wait until records of a requested class are queued.
    pub async fn wait_for_data(&self, timeout: Duration, samples: bool, events: bool) -> bool {
        let brk = self.break_token();
        framing::wait_for_data(&self.shared, &brk, self.wait_params(timeout), samples, events).await
    }

    fn wait_params(&self, timeout: Duration) -> WaitParams {
        WaitParams { timeout, poll: self.config.poll_interval() }
    }

    fn break_token(&self) -> CancellationToken {
        self.brk.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Interrupt every wait in progress and every wait started until
    /// [`reset_break`](Self::reset_break).
    pub fn terminal_break(&self) {
        debug!("Terminal break requested");
        self.break_token().cancel();
    }

    pub fn reset_break(&self) {
        *self.brk.lock().unwrap_or_else(PoisonError::into_inner) = CancellationToken::new();
    }

    pub fn break_requested(&self) -> bool {
        self.break_token().is_cancelled()
    }

    // Kinematics

    /// Velocity, acceleration and centre sample from the newest full window.
    pub fn kinematics(&self, model: VelocityModel) -> Option<KinematicEstimate> {
        self.shared.lock().estimate(model)
    }

    /// Overall speed per eye.
    pub fn velocity(&self, model: VelocityModel) -> EyePair<Option<f32>> {
        self.kinematics(model).map_or(EyePair::both(None), |e| e.speed)
    }

    /// Per-axis velocity per eye.
    pub fn velocity_xy(&self, model: VelocityModel) -> EyePair<Option<XY<f32>>> {
        self.kinematics(model).map_or(EyePair::both(None), |e| e.velocity)
    }

    pub fn velocity_and_acceleration(
        &self,
        model: VelocityModel,
    ) -> (EyePair<Option<f32>>, EyePair<Option<f32>>) {
        self.kinematics(model)
            .map_or((EyePair::both(None), EyePair::both(None)), |e| (e.speed, e.acceleration))
    }
}

impl Drop for LinkConnection {
    fn drop(&mut self) {
        debug!("Dropping link connection");
        if let Some(driver) = &self.driver {
            driver.cancel();
        }
    }
}
