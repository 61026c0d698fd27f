//! # vocprep
//!
//! Batch preprocessing of speech corpora for statistical synthesizer
//! training. Alignment labels and waveforms are matched by basename and
//! converted into one of three output layouts:
//!
//! - **Combined** (`--lab_dir` and `--wav_dir`): `{id}.proto` feature archive
//! - **Label-only** (`--lab_dir`): `{id}.dur` frame count and `{id}.lab` binary label
//! - **Waveform-only** (`--wav_dir`): `{id}.f0`, `{id}.mgc`, `{id}.bap`
//!
//! The per-id processors work through the [`types::LabelLoader`] and
//! [`types::WavLoader`] traits; [`label`] and [`vocoder`] hold the shipped
//! backends.

pub mod archive;
pub mod cli;
pub mod error;
pub mod file_ids;
pub mod file_io;
pub mod label;
pub mod mode;
pub mod pairing;
pub mod processor;
pub mod types;
pub mod vocoder;

pub use archive::FeatureArchive;
pub use error::{ProcessError, ProcessResult};
pub use label::{HtsLabelLoader, LabelError};
pub use mode::ProcessingMode;
pub use processor::{Processor, RunSummary};
pub use types::{FeatureMatrix, FileId, Label, LabelLoader, VocoderFeatures, Wav, WavLoader};
pub use vocoder::{ExtractionError, VocoderSettings, VocoderWavLoader};
