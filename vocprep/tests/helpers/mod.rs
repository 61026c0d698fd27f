//! Corpus fixtures for integration tests
//!
//! Writes small waveform, alignment and question files into a temp
//! directory laid out as `lab/`, `wav/` and `out/`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// 100 ns label units per 5 ms frame
pub const UNITS_PER_FRAME: u64 = 50_000;

/// Configuration for a generated tone
#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f64,
    pub amplitude: f64,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 0.2,
            sample_rate: 16000,
            channels: 1,
            frequency: 220.0,
            amplitude: 0.3,
        }
    }
}

/// Write a 16-bit PCM WAV holding a harmonic-rich tone
pub fn generate_tone_wav(path: &Path, config: &ToneConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    let nyquist = config.sample_rate as f64 / 2.0;

    for i in 0..total_samples {
        let t = i as f64 / config.sample_rate as f64;
        let mut value = 0.0;
        let mut harmonic = 1;
        while harmonic as f64 * config.frequency < nyquist && harmonic <= 10 {
            value += (2.0 * std::f64::consts::PI * config.frequency * harmonic as f64 * t).sin()
                / harmonic as f64;
            harmonic += 1;
        }
        let sample = (config.amplitude * 0.5 * value * i16::MAX as f64) as i16;

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Write a phone-level alignment of `(name, frames)` segments
pub fn write_alignment(path: &Path, phones: &[(&str, u64)]) -> anyhow::Result<()> {
    let mut content = String::new();
    let mut start = 0;
    for (name, frames) in phones {
        let end = start + frames * UNITS_PER_FRAME;
        content.push_str(&format!("{} {} {}\n", start, end, name));
        start = end;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Temp corpus with `lab/`, `wav/` and a not yet created `out/`
pub struct Corpus {
    pub root: TempDir,
    pub lab_dir: PathBuf,
    pub wav_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Corpus {
    pub fn new() -> anyhow::Result<Self> {
        let root = TempDir::new()?;
        let lab_dir = root.path().join("lab");
        let wav_dir = root.path().join("wav");
        let out_dir = root.path().join("out");
        std::fs::create_dir_all(&lab_dir)?;
        std::fs::create_dir_all(&wav_dir)?;
        Ok(Self {
            root,
            lab_dir,
            wav_dir,
            out_dir,
        })
    }

    /// Label `{id}.lab` spanning `frames` frames over two phones
    pub fn add_label(&self, id: &str, frames: u64) -> anyhow::Result<()> {
        let first = frames / 2;
        let phones = [("sil-a+b", first), ("a-b+sil", frames - first)];
        let phones: Vec<(&str, u64)> = phones.into_iter().filter(|(_, f)| *f > 0).collect();
        write_alignment(&self.lab_dir.join(format!("{}.lab", id)), &phones)
    }

    /// Waveform `{id}.wav`
    pub fn add_wav(&self, id: &str, config: &ToneConfig) -> anyhow::Result<()> {
        generate_tone_wav(&self.wav_dir.join(format!("{}.wav", id)), config)?;
        Ok(())
    }

    /// Write a file at the corpus root
    pub fn write_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.root.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Sorted file names in `out/`
    pub fn outputs(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.out_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Little-endian f32 values of a raw output file
pub fn read_f32(path: &Path) -> Vec<f32> {
    let bytes = std::fs::read(path).unwrap_or_default();
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
