//! Integration tests for the connection layer
//!
//! These tests drive connections through replay and channel sources and
//! through direct ingestion, checking the ordered path, the latest-value path
//! and the blocking waits together.

use super::*;
use crate::config::LinkConfig;
use crate::kinematics::VelocityModel;
use crate::sources::{ReplaySource, channel};
use crate::test_utils::{
    binocular_sample, block_start, control, left_eye_run, packets, recording_session,
};
use crate::types::{ControlKind, Eye, EyeAvailability, Record, UpdateRate};
use futures::StreamExt;
use std::time::Duration;
use tracing::info;

fn manual() -> LinkConnection {
    LinkConnection::new(LinkConfig::default()).expect("default config is valid")
}

#[tokio::test]
async fn replayed_session_is_delivered_in_order() {
    let _ = tracing_subscriber::fmt::try_init();

    let records = recording_session(20);
    let source = ReplaySource::from_records(&records, 500.0).unwrap();
    let connection = LinkConnection::open(source, LinkConfig::default()).unwrap();

    assert!(connection.wait_for_block_start(Duration::from_secs(2), true, true).await);
    assert_eq!(connection.eye_available(), Some(EyeAvailability::Binocular));

    let mut samples = 0;
    let mut last_time = 0;
    while connection.wait_for_data(Duration::from_millis(200), true, true).await {
        while let Some(delivered) = connection.next() {
            assert!(delivered.gaps.is_empty());
            assert!(delivered.record.time() >= last_time);
            last_time = delivered.record.time();
            if matches!(delivered.record.as_ref(), Record::Sample(_)) {
                samples += 1;
            }
        }
    }
    info!("Delivered {} samples", samples);
    assert_eq!(samples, 20);
    assert!(!connection.in_data_block(true, false));
    assert!(connection.input_ended());
}

#[tokio::test]
async fn latest_value_does_not_disturb_ordered_path() {
    let connection = manual();
    for record in recording_session(5) {
        connection.ingest_record(record);
    }

    assert!(connection.has_new_sample());
    let latest = connection.latest_float_sample().unwrap();
    assert_eq!(latest.time, 10);
    assert!(!connection.has_new_sample());

    // The newest record overall is the event block end.
    assert!(matches!(
        connection.latest_record().unwrap().as_ref(),
        Record::Control(c) if c.kind == ControlKind::EndEvents
    ));

    let first = connection.next().unwrap();
    assert!(matches!(first.record.as_ref(), Record::Control(_)));
    assert_eq!(connection.last_record().unwrap(), first);
    assert_eq!(connection.data_count(true, false), 5);
}

#[tokio::test]
async fn velocity_scenario_left_eye_only() {
    let connection = manual();
    connection.ingest_record(control(ControlKind::StartSamples, 0));
    for record in left_eye_run(4, 5, 4, 10.0) {
        connection.ingest_record(record);
    }

    let xy = connection.velocity_xy(VelocityModel::FiveSample);
    let left = xy.left.expect("left eye velocity");
    assert!(left.x.is_finite() && left.x != 0.0);
    assert_eq!(xy.right, None);

    let (speed, acceleration) = connection.velocity_and_acceleration(VelocityModel::FiveSample);
    assert!(speed.left.is_some() && acceleration.left.is_some());
    assert_eq!(speed.right, None);

    // Nine samples are not there yet.
    assert_eq!(connection.velocity(VelocityModel::NineSample).left, None);
    let estimate = connection.kinematics(VelocityModel::FiveSample).unwrap();
    assert_eq!(estimate.centre.time, 12);
}

#[tokio::test]
async fn terminal_break_until_reset() {
    let connection = manual();
    assert!(!connection.break_requested());

    connection.terminal_break();
    assert!(connection.break_requested());
    connection.ingest_record(binocular_sample(1, 0.0, 0.0));
    assert!(!connection.wait_for_data(Duration::from_secs(5), true, false).await);

    connection.reset_break();
    assert!(!connection.break_requested());
    assert!(connection.wait_for_data(Duration::from_secs(5), true, false).await);
}

#[tokio::test]
async fn channel_source_feeds_waiters() {
    let (tx, source) = channel(64, 500.0);
    let connection = LinkConnection::open(source, LinkConfig::default()).unwrap();
    assert_eq!(connection.source_hz(), 500.0);

    tokio::spawn(async move {
        for packet in packets(&[block_start(ControlKind::StartSamples, 0)]) {
            tx.send(packet).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        for packet in packets(&[binocular_sample(2, 100.0, 100.0)]) {
            tx.send(packet).await.unwrap();
        }
        tx.send(vec![0xFF]).await.unwrap();
    });

    assert!(connection.wait_for_block_start(Duration::from_secs(2), true, false).await);
    assert!(connection.wait_for_data(Duration::from_secs(2), true, false).await);
    let sample = connection.next_sample().unwrap();
    assert_eq!(sample.record.time(), 2);

    // The garbage packet is counted once the driver gets to it.
    tokio::time::timeout(Duration::from_secs(2), async {
        while connection.stats().malformed == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn latest_samples_stream() {
    let connection = manual();
    let mut stream = connection.latest_samples(UpdateRate::Native);

    connection.ingest_record(binocular_sample(1, 50.0, 60.0));
    let next = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
    let sample = next.unwrap().unwrap();
    assert_eq!(sample.gaze.get(Eye::Right).x, Some(50.0));
    assert_eq!(sample.gaze.get(Eye::Right).y, Some(60.0));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_stream_skips_to_newest() {
    let connection = manual();
    let mut stream = connection.latest_samples(UpdateRate::Max(50));

    connection.ingest_record(binocular_sample(1, 0.0, 0.0));
    assert_eq!(stream.next().await.unwrap().time, 1);

    for t in 2..=6 {
        connection.ingest_record(binocular_sample(t, 0.0, 0.0));
    }
    assert_eq!(stream.next().await.unwrap().time, 6);
}

#[tokio::test]
async fn reset_clear_empties_everything() {
    let connection = manual();
    for record in recording_session(3) {
        connection.ingest_record(record);
    }
    connection.data_switch(false, true);
    assert!(!connection.ingest_record(binocular_sample(100, 0.0, 0.0)));

    connection.reset(true);
    assert_eq!(connection.data_count(true, true), 0);
    assert!(connection.latest_record().is_none());
    assert_eq!(connection.status().stats.decoded, 0);
    assert_eq!(connection.sample_content_flags().value(), 0);
}

#[tokio::test]
async fn elided_fields_restored_from_delivered_samples() {
    use crate::types::link_flags::sample_content as sc;
    use crate::types::{Flags, IntSample, XY};

    let connection = manual();
    let mut bare = IntSample::new(4);
    bare.content = Flags(sc::TIMESTAMP | sc::LEFT | sc::RIGHT | sc::GAZE_XY);
    bare.gaze.left = XY::new(5000, 4000);
    bare.gaze.right = XY::new(5010, 4000);

    // Nothing delivered yet, so nothing to restore from.
    assert_eq!(connection.restore_elided(&bare), bare);

    connection.ingest_record(block_start(ControlKind::StartSamples, 0));
    connection.ingest_record(binocular_sample(2, 500.0, 400.0));
    connection.ingest_record(Record::Sample(bare.clone()));
    connection.next();
    connection.next();

    let delivered = connection.next_sample().unwrap();
    let sample = delivered.record.as_sample().unwrap();
    assert!(!sample.has(sc::GAZE_RES));
    let restored = connection.restore_elided(sample);
    assert!(restored.has(sc::GAZE_RES | sc::PUPIL_SIZE | sc::STATUS));
    assert_eq!(restored.resolution, XY::new(352, 340));
    assert_eq!(restored.pupil_size.right, 1150);
    assert_eq!(restored.gaze, bare.gaze);
}

#[test]
fn invalid_config_is_rejected() {
    let config = LinkConfig { history_len: 4, ..LinkConfig::default() };
    assert!(LinkConnection::new(config).is_err());
}
