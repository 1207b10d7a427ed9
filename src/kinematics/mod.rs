//! Online velocity and acceleration from recent samples.
//!
//! Each [`VelocityModel`] fixes a symmetric window of `2m + 1` samples. The
//! estimate is computed for the centre sample of the newest window, using every
//! sample in it rather than only the endpoints:
//!
//! ```text
//! v = Σ_{k=1..m} (x[c+k] - x[c-k]) / (m (m + 1) Δt)
//! a = Σ_{k=1..m} k² (x[c+k] + x[c-k] - 2 x[c]) / (Δt² Σ k⁴)
//! ```
//!
//! Both are exact for a constant velocity (or constant acceleration) path and
//! average out the quantization of fixed-point gaze.
//!
//! Gaze is converted to degrees of visual angle with the centre sample's
//! resolution when it is present, otherwise results stay in pixels per second.
//!
//! An eye gets `None` when any sample in the window lacks valid gaze for it.
//! Both eyes get `None` when the window is short or crosses a gap.

mod window;

pub use window::{SampleWindow, WindowEntry};

use serde::{Deserialize, Serialize};

use crate::types::link_flags::sample_content as sc;
use crate::types::{Eye, EyePair, FloatSample, XY};

/// Numerical model, selecting the window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum VelocityModel {
    FiveSample,
    NineSample,
    SeventeenSample,
    /// Wide window matching the tracker's own online velocity filter.
    Tracker,
}

impl VelocityModel {
    pub const ALL: [VelocityModel; 4] = [
        VelocityModel::FiveSample,
        VelocityModel::NineSample,
        VelocityModel::SeventeenSample,
        VelocityModel::Tracker,
    ];

    /// Largest window any model needs.
    pub const MAX_WINDOW: usize = 33;

    pub fn window_len(self) -> usize {
        match self {
            VelocityModel::FiveSample => 5,
            VelocityModel::NineSample => 9,
            VelocityModel::SeventeenSample => 17,
            VelocityModel::Tracker => Self::MAX_WINDOW,
        }
    }

    /// Model number used by tracker tooling (1 to 4).
    pub fn code(self) -> u8 {
        match self {
            VelocityModel::FiveSample => 1,
            VelocityModel::NineSample => 2,
            VelocityModel::SeventeenSample => 3,
            VelocityModel::Tracker => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.code() == code)
    }

    fn half_width(self) -> usize {
        self.window_len() / 2
    }
}

/// Kinematics of one centre sample.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicEstimate {
    /// The sample the estimate applies to.
    pub centre: FloatSample,
    /// Per-axis velocity, degrees (or pixels) per second.
    pub velocity: EyePair<Option<XY<f32>>>,
    /// Overall speed.
    pub speed: EyePair<Option<f32>>,
    /// Magnitude of acceleration, per second squared.
    pub acceleration: EyePair<Option<f32>>,
}

/// Estimate kinematics from the newest samples in `window`.
pub fn estimate(model: VelocityModel, window: &SampleWindow) -> Option<KinematicEstimate> {
    let n = model.window_len();
    let entries = window.recent(n)?;
    // A gap before the first entry precedes the window and does not split it.
    if entries.clone().skip(1).any(|entry| entry.gap_before) {
        return None;
    }
    let samples: Vec<&FloatSample> = entries.map(|entry| &entry.sample).collect();
    estimate_samples(model, &samples)
}

/// Estimate kinematics from exactly `model.window_len()` contiguous samples,
/// oldest first.
pub fn estimate_samples(
    model: VelocityModel,
    samples: &[&FloatSample],
) -> Option<KinematicEstimate> {
    let n = model.window_len();
    if samples.len() != n {
        return None;
    }
    let first = samples[0].effective_time();
    let last = samples[n - 1].effective_time();
    let dt = (last - first) / (n - 1) as f64 / 1000.0;
    if dt.is_nan() || dt <= 0.0 {
        return None;
    }

    let m = model.half_width();
    let centre = samples[m];
    let scale = centre.resolution.map(|r| match r {
        Some(r) if r > 0.0 => f64::from(r),
        _ => 1.0,
    });

    let per_eye = EyePair::both(()).map(|eye, _| {
        let path = gaze_path(samples, eye)?;
        let vx = central_difference(&path.x, m, dt) / scale.x;
        let vy = central_difference(&path.y, m, dt) / scale.y;
        let ax = second_difference(&path.x, m, dt) / scale.x;
        let ay = second_difference(&path.y, m, dt) / scale.y;
        Some((XY::new(vx as f32, vy as f32), vx.hypot(vy) as f32, ax.hypot(ay) as f32))
    });

    Some(KinematicEstimate {
        centre: centre.clone(),
        velocity: per_eye.map(|_, e| e.map(|(v, _, _)| v)),
        speed: per_eye.map(|_, e| e.map(|(_, s, _)| s)),
        acceleration: per_eye.map(|_, e| e.map(|(_, _, a)| a)),
    })
}

/// Overall speed per eye.
pub fn velocity(model: VelocityModel, window: &SampleWindow) -> EyePair<Option<f32>> {
    estimate(model, window).map_or(EyePair::both(None), |e| e.speed)
}

/// Per-axis velocity per eye.
pub fn velocity_xy(model: VelocityModel, window: &SampleWindow) -> EyePair<Option<XY<f32>>> {
    estimate(model, window).map_or(EyePair::both(None), |e| e.velocity)
}

/// Overall speed and acceleration per eye.
pub fn velocity_and_acceleration(
    model: VelocityModel,
    window: &SampleWindow,
) -> (EyePair<Option<f32>>, EyePair<Option<f32>>) {
    estimate(model, window)
        .map_or((EyePair::both(None), EyePair::both(None)), |e| (e.speed, e.acceleration))
}

fn gaze_path(samples: &[&FloatSample], eye: Eye) -> Option<XY<Vec<f64>>> {
    let mut xs = Vec::with_capacity(samples.len());
    let mut ys = Vec::with_capacity(samples.len());
    for sample in samples {
        if !sample.has_eye(eye) || !sample.has(sc::GAZE_XY) {
            return None;
        }
        let gaze = sample.gaze.get(eye);
        let (x, y) = (gaze.x?, gaze.y?);
        if sample.has(sc::PUPIL_SIZE) && !sample.pupil_size.get(eye).is_some_and(|p| p > 0.0) {
            return None;
        }
        xs.push(f64::from(x));
        ys.push(f64::from(y));
    }
    Some(XY::new(xs, ys))
}

fn central_difference(x: &[f64], m: usize, dt: f64) -> f64 {
    let c = m;
    let sum: f64 = (1..=m).map(|k| x[c + k] - x[c - k]).sum();
    sum / ((m * (m + 1)) as f64 * dt)
}

fn second_difference(x: &[f64], m: usize, dt: f64) -> f64 {
    let c = m;
    let (num, den) = (1..=m).fold((0.0, 0.0), |(num, den), k| {
        let k2 = (k * k) as f64;
        (num + k2 * (x[c + k] + x[c - k] - 2.0 * x[c]), den + k2 * k2)
    });
    num / (den * dt * dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::float_sample;

    fn window_with(samples: impl IntoIterator<Item = FloatSample>) -> SampleWindow {
        let mut window = SampleWindow::new(VelocityModel::MAX_WINDOW);
        for sample in samples {
            window.push(sample);
        }
        window
    }

    #[test]
    fn model_codes() {
        for model in VelocityModel::ALL {
            assert_eq!(VelocityModel::from_code(model.code()), Some(model));
            assert_eq!(model.window_len() % 2, 1);
        }
        assert_eq!(VelocityModel::from_code(0), None);
    }

    #[test]
    fn five_sample_left_eye_only() {
        // 4 ms spacing, gaze x advancing 10 px per sample
        let window =
            window_with((0..5u32).map(|i| float_sample(i * 4, Some(i as f32 * 10.0), None)));

        let speeds = velocity(VelocityModel::FiveSample, &window);
        let left = speeds.left.expect("left eye velocity");
        assert!(left.is_finite());
        assert!((left - 2500.0).abs() < 1e-2);
        assert_eq!(speeds.right, None);

        let xy = velocity_xy(VelocityModel::FiveSample, &window).left.unwrap();
        assert!((xy.x - 2500.0).abs() < 1e-2);
        assert_eq!(xy.y, 0.0);
    }

    #[test]
    fn short_window_is_missing_for_that_eye_only() {
        let window = window_with((0..9u32).map(|i| {
            let right = (i != 4).then_some(i as f32);
            float_sample(i * 2, Some(i as f32), right)
        }));

        let speeds = velocity(VelocityModel::NineSample, &window);
        assert!(speeds.left.is_some());
        assert_eq!(speeds.right, None);

        let shorter = window_with((0..8u32).map(|i| float_sample(i * 2, Some(0.0), Some(0.0))));
        assert_eq!(velocity(VelocityModel::NineSample, &shorter), EyePair::both(None));
    }

    #[test]
    fn gap_inside_window_invalidates() {
        let mut window = SampleWindow::new(16);
        for i in 0..3u32 {
            window.push(float_sample(i, Some(i as f32), Some(i as f32)));
        }
        window.mark_gap();
        for i in 3..5u32 {
            window.push(float_sample(i, Some(i as f32), Some(i as f32)));
        }
        assert!(estimate(VelocityModel::FiveSample, &window).is_none());

        // Once the gap slides out of the window the estimate returns.
        window.push(float_sample(5, Some(5.0), Some(5.0)));
        window.push(float_sample(6, Some(6.0), Some(6.0)));
        window.push(float_sample(7, Some(7.0), Some(7.0)));
        assert!(estimate(VelocityModel::FiveSample, &window).is_some());
    }

    #[test]
    fn constant_acceleration_is_recovered() {
        // x = 0.5 * a * t², a = 400 px/s², 2 ms spacing
        let a = 400.0f64;
        let window = window_with((0..17u32).map(|i| {
            let t = f64::from(i) * 0.002;
            float_sample(i * 2, Some((0.5 * a * t * t) as f32), None)
        }));

        let (speeds, accelerations) =
            velocity_and_acceleration(VelocityModel::SeventeenSample, &window);
        let centre_t = 8.0 * 0.002;
        assert!((f64::from(speeds.left.unwrap()) - a * centre_t).abs() < 0.5);
        assert!((f64::from(accelerations.left.unwrap()) - a).abs() < 5.0);
    }

    #[test]
    fn resolution_converts_to_degrees() {
        let window = window_with((0..5u32).map(|i| {
            let mut sample = float_sample(i, Some(i as f32 * 4.0), None);
            sample.resolution = XY::new(Some(40.0), Some(40.0));
            sample
        }));
        let estimate = estimate(VelocityModel::FiveSample, &window).unwrap();
        // 4 px per ms = 4000 px/s = 100 deg/s
        assert!((estimate.speed.left.unwrap() - 100.0).abs() < 1e-3);
        assert_eq!(estimate.centre.time, 2);
    }

    #[test]
    fn closed_pupil_invalidates_eye() {
        let window = window_with((0..5u32).map(|i| {
            let mut sample = float_sample(i, Some(i as f32), Some(i as f32));
            if i == 2 {
                sample.pupil_size.right = Some(0.0);
            }
            sample
        }));
        let speeds = velocity(VelocityModel::FiveSample, &window);
        assert!(speeds.left.is_some());
        assert!(speeds.right.is_none());
    }
}
