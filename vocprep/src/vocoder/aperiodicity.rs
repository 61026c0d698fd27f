//! Band aperiodicity
//!
//! Coarse bands are centred every 3 kHz up to 15 kHz (or Nyquist - 3 kHz),
//! matching the WORLD coarse aperiodicity layout. Within a band the power
//! found between harmonics is compared with the power at the harmonics;
//! the ratio in dB is the band's aperiodicity. Unvoiced frames are fully
//! aperiodic (0 dB).

/// Band spacing and width, Hz
const BAND_INTERVAL_HZ: f64 = 3000.0;

/// Highest band centre, Hz
const UPPER_LIMIT_HZ: f64 = 15000.0;

/// Most periodic value reported, dB
pub const MIN_APERIODICITY_DB: f64 = -60.0;

/// Number of coarse aperiodicity bands for a sample rate (at least 1)
pub fn band_count(sample_rate: u32) -> usize {
    let limit = UPPER_LIMIT_HZ.min(sample_rate as f64 / 2.0 - BAND_INTERVAL_HZ);
    ((limit / BAND_INTERVAL_HZ).floor().max(0.0) as usize).max(1)
}

/// Aperiodicity per band in dB for one frame
///
/// `power` holds bins `0..=fft_size/2`.
pub fn band_aperiodicity(power: &[f64], f0: f64, sample_rate: u32, bands: usize) -> Vec<f32> {
    if f0 <= 0.0 {
        return vec![0.0; bands];
    }

    let fft_size = (power.len() - 1) * 2;
    let bin_hz = sample_rate as f64 / fft_size as f64;
    let nyquist = sample_rate as f64 / 2.0;

    (0..bands)
        .map(|band| {
            let centre = BAND_INTERVAL_HZ * (band + 1) as f64;
            let lo = (centre - BAND_INTERVAL_HZ / 2.0).max(0.0);
            let hi = (centre + BAND_INTERVAL_HZ / 2.0).min(nyquist);

            let mut harmonic = 0.0;
            let mut between = 0.0;
            let first = (lo / f0).ceil().max(1.0) as usize;
            let mut h = first;
            while (h as f64) * f0 <= hi {
                let peak_bin = (h as f64 * f0 / bin_hz).round() as usize;
                let valley_bin = ((h as f64 + 0.5) * f0 / bin_hz).round() as usize;
                harmonic += neighbourhood(power, peak_bin, f64::max);
                between += neighbourhood(power, valley_bin, f64::min);
                h += 1;
            }

            if harmonic <= 0.0 {
                return 0.0;
            }
            let ratio_db = 10.0 * ((between + 1e-12) / (harmonic + 1e-12)).log10();
            ratio_db.clamp(MIN_APERIODICITY_DB, 0.0) as f32
        })
        .collect()
}

/// Fold `op` over the bin and its immediate neighbours
fn neighbourhood(power: &[f64], bin: usize, op: fn(f64, f64) -> f64) -> f64 {
    let last = power.len() - 1;
    let centre = bin.min(last);
    let mut acc = power[centre];
    if centre > 0 {
        acc = op(acc, power[centre - 1]);
    }
    if centre < last {
        acc = op(acc, power[centre + 1]);
    }
    acc
}
