//! Fundamental frequency tracking
//!
//! Normalised autocorrelation over a window of two maximum periods. The
//! first local peak within 90% of the best peak is taken, which avoids
//! picking period multiples on strongly periodic frames.

use super::frame_segment;

/// Frames quieter than this RMS are unvoiced
const SILENCE_RMS: f64 = 1e-4;

/// Share of the best peak a lower lag must reach to win
const FIRST_PEAK_RATIO: f64 = 0.9;

/// Pitch search parameters, in samples
#[derive(Debug, Clone, Copy)]
pub struct PitchSearch {
    pub min_lag: usize,
    pub max_lag: usize,
    pub voicing_threshold: f64,
}

impl PitchSearch {
    pub fn new(sample_rate: u32, f0_floor: f64, f0_ceil: f64, voicing_threshold: f64) -> Self {
        let sr = sample_rate as f64;
        Self {
            min_lag: ((sr / f0_ceil).floor() as usize).max(2),
            max_lag: (sr / f0_floor).ceil() as usize,
            voicing_threshold,
        }
    }

    fn window_len(&self) -> usize {
        2 * self.max_lag
    }
}

/// f0 in Hz for each frame centre, 0.0 when unvoiced
pub fn track_f0(
    samples: &[f32],
    sample_rate: u32,
    hop: usize,
    frames: usize,
    search: &PitchSearch,
) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let segment = frame_segment(samples, i * hop, search.window_len());
            estimate_frame(&segment, sample_rate, search)
        })
        .collect()
}

fn estimate_frame(segment: &[f64], sample_rate: u32, search: &PitchSearch) -> f32 {
    let n = segment.len();
    let mean = segment.iter().sum::<f64>() / n as f64;
    let x: Vec<f64> = segment.iter().map(|v| v - mean).collect();

    let rms = (x.iter().map(|v| v * v).sum::<f64>() / n as f64).sqrt();
    if rms < SILENCE_RMS {
        return 0.0;
    }

    let max_lag = search.max_lag.min(n.saturating_sub(2));
    if max_lag <= search.min_lag + 1 {
        return 0.0;
    }

    // r[lag - (min_lag - 1)] for lags min_lag-1 ..= max_lag+1 so peaks at the edges can be tested
    let lo = search.min_lag - 1;
    let hi = (max_lag + 1).min(n - 1);
    let r: Vec<f64> = (lo..=hi).map(|lag| normalized_autocorrelation(&x, lag)).collect();

    let best = r[1..r.len() - 1].iter().cloned().fold(f64::MIN, f64::max);
    if best < search.voicing_threshold {
        return 0.0;
    }

    let target = best * FIRST_PEAK_RATIO;
    for k in 1..r.len() - 1 {
        if r[k] >= target && r[k] >= r[k - 1] && r[k] >= r[k + 1] {
            let lag = (lo + k) as f64 + parabolic_offset(r[k - 1], r[k], r[k + 1]);
            return (sample_rate as f64 / lag) as f32;
        }
    }

    0.0
}

fn normalized_autocorrelation(x: &[f64], lag: usize) -> f64 {
    let (mut cross, mut e0, mut e1) = (0.0, 0.0, 0.0);
    for n in 0..x.len() - lag {
        cross += x[n] * x[n + lag];
        e0 += x[n] * x[n];
        e1 += x[n + lag] * x[n + lag];
    }
    let denom = (e0 * e1).sqrt();
    if denom <= f64::EPSILON {
        0.0
    } else {
        cross / denom
    }
}

/// Vertex offset of the parabola through three equally spaced points
fn parabolic_offset(left: f64, centre: f64, right: f64) -> f64 {
    let denom = left - 2.0 * centre + right;
    if denom.abs() <= f64::EPSILON {
        0.0
    } else {
        (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
    }
}
