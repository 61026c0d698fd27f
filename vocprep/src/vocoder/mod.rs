//! Vocoder feature extraction backend
//!
//! Produces three frame-aligned streams per waveform:
//! - `f0`: autocorrelation pitch, Hz, 0 when unvoiced ([`pitch`])
//! - `mgc`: mel-cepstrum of the Hann-windowed log spectrum ([`spectrum`])
//! - `bap`: coarse band aperiodicity in dB ([`aperiodicity`])
//!
//! Frame `i` is centred on sample `i * hop`; a waveform of `n` samples
//! gives `n / hop + 1` frames.

pub mod aperiodicity;
pub mod audio;
pub mod pitch;
pub mod spectrum;

use std::path::{Path, PathBuf};
use thiserror::Error;

use vocprep_common::config::VocoderConfig;

use crate::types::{FeatureMatrix, VocoderFeatures, Wav, WavLoader};
use audio::MonoAudio;
use pitch::PitchSearch;
use spectrum::SpectrumAnalyzer;

/// Feature extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Waveform could not be opened or decoded
    #[error("Cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Sample rate conversion failed
    #[error("Resampling error: {0}")]
    Resample(String),

    /// Analysis parameters do not fit the waveform
    #[error("Invalid analysis parameters: {0}")]
    InvalidParameters(String),

    /// Waveform holds no samples
    #[error("Waveform {0} is empty")]
    EmptyAudio(PathBuf),
}

/// All-pass constant giving a good mel-scale fit at common sample rates
pub fn default_alpha(sample_rate: u32) -> f64 {
    match sample_rate {
        8000 => 0.31,
        16000 => 0.42,
        22050 => 0.45,
        24000 => 0.47,
        44100 => 0.53,
        48000 => 0.55,
        _ => 0.42,
    }
}

/// Analysis parameters shared by every waveform in a run
#[derive(Debug, Clone, PartialEq)]
pub struct VocoderSettings {
    pub frame_shift_ms: f64,
    pub target_sample_rate: Option<u32>,
    pub fft_size: usize,
    pub mgc_order: usize,
    pub alpha: Option<f64>,
    pub f0_floor: f64,
    pub f0_ceil: f64,
    pub voicing_threshold: f64,
}

impl VocoderSettings {
    pub fn from_config(config: &VocoderConfig, frame_shift_ms: f64) -> Self {
        Self {
            frame_shift_ms,
            target_sample_rate: config.sample_rate,
            fft_size: config.fft_size,
            mgc_order: config.mgc_order,
            alpha: config.alpha,
            f0_floor: config.f0_floor,
            f0_ceil: config.f0_ceil,
            voicing_threshold: config.voicing_threshold,
        }
    }

    /// Hop size in samples at `sample_rate`
    pub fn hop(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 * self.frame_shift_ms / 1000.0).round() as usize
    }

    fn check(&self, sample_rate: u32) -> Result<(), ExtractionError> {
        if self.hop(sample_rate) == 0 {
            return Err(ExtractionError::InvalidParameters(format!(
                "frame shift {} ms is below one sample at {} Hz",
                self.frame_shift_ms, sample_rate
            )));
        }
        if self.f0_ceil >= sample_rate as f64 / 2.0 {
            return Err(ExtractionError::InvalidParameters(format!(
                "f0 ceiling {} Hz is not below Nyquist at {} Hz",
                self.f0_ceil, sample_rate
            )));
        }
        Ok(())
    }
}

impl Default for VocoderSettings {
    fn default() -> Self {
        Self::from_config(&VocoderConfig::default(), 5.0)
    }
}

/// Decoded waveform ready for analysis
#[derive(Debug, Clone)]
pub struct AnalysisWav {
    audio: MonoAudio,
    settings: VocoderSettings,
}

impl AnalysisWav {
    pub fn new(audio: MonoAudio, settings: VocoderSettings) -> Self {
        Self { audio, settings }
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    /// Frames `extract_features` will produce
    pub fn frame_count(&self) -> usize {
        match self.settings.hop(self.audio.sample_rate) {
            0 => 0,
            hop => self.audio.samples.len() / hop + 1,
        }
    }
}

impl Wav for AnalysisWav {
    fn extract_features(&self) -> Result<VocoderFeatures, ExtractionError> {
        let sample_rate = self.audio.sample_rate;
        self.settings.check(sample_rate)?;

        let samples = &self.audio.samples;
        let hop = self.settings.hop(sample_rate);
        let frames = self.frame_count();
        let alpha = self.settings.alpha.unwrap_or_else(|| default_alpha(sample_rate));
        let bands = aperiodicity::band_count(sample_rate);

        let search = PitchSearch::new(
            sample_rate,
            self.settings.f0_floor,
            self.settings.f0_ceil,
            self.settings.voicing_threshold,
        );
        let f0 = pitch::track_f0(samples, sample_rate, hop, frames, &search);

        let analyzer = SpectrumAnalyzer::new(self.settings.fft_size);
        let mut mgc = Vec::with_capacity(frames * (self.settings.mgc_order + 1));
        let mut bap = Vec::with_capacity(frames * bands);
        for (i, &frame_f0) in f0.iter().enumerate() {
            let segment = frame_segment(samples, i * hop, analyzer.fft_size());
            let power = analyzer.power_spectrum(&segment);

            mgc.extend(
                analyzer
                    .mel_cepstrum(&power, self.settings.mgc_order, alpha)
                    .into_iter()
                    .map(|c| c as f32),
            );
            bap.extend(aperiodicity::band_aperiodicity(
                &power,
                frame_f0 as f64,
                sample_rate,
                bands,
            ));
        }

        let voiced = f0.iter().filter(|v| **v > 0.0).count();
        tracing::debug!(
            frames = frames,
            voiced = voiced,
            alpha = alpha,
            bands = bands,
            "Vocoder analysis complete"
        );

        let shape_err =
            || ExtractionError::InvalidParameters("feature stream has a ragged shape".to_string());
        Ok(VocoderFeatures {
            f0: FeatureMatrix::column(f0),
            mgc: FeatureMatrix::from_vec(frames, self.settings.mgc_order + 1, mgc)
                .ok_or_else(shape_err)?,
            bap: FeatureMatrix::from_vec(frames, bands, bap).ok_or_else(shape_err)?,
        })
    }
}

/// Loads waveforms from disk and applies the run's resampling policy
#[derive(Debug, Clone, Default)]
pub struct VocoderWavLoader {
    settings: VocoderSettings,
}

impl VocoderWavLoader {
    pub fn new(settings: VocoderSettings) -> Self {
        Self { settings }
    }
}

impl WavLoader for VocoderWavLoader {
    type Wav = AnalysisWav;

    fn load(&self, path: &Path) -> Result<AnalysisWav, ExtractionError> {
        let mut audio = audio::decode_mono(path)?;
        if audio.samples.is_empty() {
            return Err(ExtractionError::EmptyAudio(path.to_path_buf()));
        }

        if let Some(target) = self.settings.target_sample_rate {
            audio = audio::resample(audio, target)?;
        }

        tracing::debug!(
            path = %path.display(),
            sample_rate = audio.sample_rate,
            duration_seconds = format!("{:.2}", audio.duration_seconds()),
            "Waveform loaded"
        );

        Ok(AnalysisWav::new(audio, self.settings.clone()))
    }
}

/// `len` samples centred on `centre`, zero-padded outside the signal
pub(crate) fn frame_segment(samples: &[f32], centre: usize, len: usize) -> Vec<f64> {
    let start = centre as isize - (len / 2) as isize;
    (0..len as isize)
        .map(|k| {
            let idx = start + k;
            if idx < 0 || idx as usize >= samples.len() {
                0.0
            } else {
                samples[idx as usize] as f64
            }
        })
        .collect()
}
