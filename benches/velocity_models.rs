//! Benchmarks for online kinematics
//!
//! Velocity is queried once per display frame or once per sample by
//! gaze-contingent code, so each model's estimate must be cheap relative to
//! the sample period. Covers every window model over a full history.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gazelink::kinematics::{self, SampleWindow};
use gazelink::test_utils::float_sample;
use gazelink::VelocityModel;
use std::hint::black_box;

fn full_window() -> SampleWindow {
    let mut window = SampleWindow::new(64);
    for i in 0..64u32 {
        let x = 100.0 + (i as f32 * 0.35).sin() * 40.0;
        window.push(float_sample(2 * i, Some(x), Some(x + 3.0)));
    }
    window
}

fn bench_models(c: &mut Criterion) {
    let window = full_window();

    let mut group = c.benchmark_group("estimate");
    for model in VelocityModel::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(model.window_len()), &model, |b, &m| {
            b.iter(|| black_box(kinematics::estimate(black_box(m), &window)))
        });
    }
    group.finish();
}

fn bench_window_push(c: &mut Criterion) {
    let mut window = full_window();
    let mut time = 128u32;

    c.bench_function("window_push_full", |b| {
        b.iter(|| {
            time += 2;
            window.push(black_box(float_sample(time, Some(1.0), Some(2.0))));
        })
    });
}

criterion_group!(benches, bench_models, bench_window_push);
criterion_main!(benches);
