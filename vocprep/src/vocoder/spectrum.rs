//! Short-time spectra and mel-cepstral analysis
//!
//! The mel-cepstrum is the real cepstrum of the log amplitude spectrum,
//! folded to its minimum-phase form and warped onto the mel scale with the
//! first-order all-pass frequency transformation (`freqt`).

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Power floor before taking logs
const POWER_FLOOR: f64 = 1e-12;

/// Hann-windowed FFT analysis of fixed length
pub struct SpectrumAnalyzer {
    fft_size: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let window = (0..fft_size)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / fft_size as f64).cos())
            .collect();

        Self {
            fft_size,
            window,
            forward: planner.plan_fft_forward(fft_size),
            inverse: planner.plan_fft_inverse(fft_size),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Power spectrum bins `0..=fft_size/2` of a `fft_size` segment
    pub fn power_spectrum(&self, segment: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = segment
            .iter()
            .zip(&self.window)
            .map(|(x, w)| Complex::new(x * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.forward.process(&mut buffer);
        buffer[..=self.fft_size / 2].iter().map(|c| c.norm_sqr()).collect()
    }

    /// Mel-cepstrum of order `order` (`order + 1` coefficients)
    pub fn mel_cepstrum(&self, power: &[f64], order: usize, alpha: f64) -> Vec<f64> {
        let n = self.fft_size;
        let half = n / 2;

        let log_amplitude: Vec<f64> = power
            .iter()
            .map(|p| 0.5 * p.max(POWER_FLOOR).ln())
            .collect();

        let mut buffer: Vec<Complex<f64>> = (0..n)
            .map(|k| {
                let bin = if k <= half { k } else { n - k };
                Complex::new(log_amplitude[bin], 0.0)
            })
            .collect();
        self.inverse.process(&mut buffer);

        // Minimum-phase folding: c[0] kept, c[1..N/2] doubled
        let cepstrum: Vec<f64> = (0..half)
            .map(|i| {
                let c = buffer[i].re / n as f64;
                if i == 0 {
                    c
                } else {
                    2.0 * c
                }
            })
            .collect();

        freqt(&cepstrum, order, alpha)
    }
}

/// Frequency transformation of a minimum-phase cepstrum
///
/// Maps cepstrum `c1` on the linear frequency axis to `order + 1`
/// coefficients on the axis warped by the all-pass constant `alpha`.
/// `alpha = 0` truncates.
pub fn freqt(c1: &[f64], order: usize, alpha: f64) -> Vec<f64> {
    let beta = 1.0 - alpha * alpha;
    let mut g = vec![0.0; order + 1];
    let mut d = vec![0.0; order + 1];

    for &c in c1.iter().rev() {
        d.copy_from_slice(&g);
        g[0] = c + alpha * d[0];
        if order >= 1 {
            g[1] = beta * d[0] + alpha * d[1];
        }
        for j in 2..=order {
            g[j] = d[j - 1] + alpha * (d[j] - g[j - 1]);
        }
    }

    g
}
