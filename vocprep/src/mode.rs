//! Processing mode selection
//!
//! Exactly one mode runs per invocation. The mode is built once from the
//! two optional input directories; supplying neither is rejected.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ProcessError, ProcessResult};

/// Which inputs a run consumes and which outputs it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Labels and waveforms: one `{id}.proto` archive per id
    Combined { lab_dir: PathBuf, wav_dir: PathBuf },
    /// Labels only: `{id}.dur` and `{id}.lab` per id
    LabelOnly { lab_dir: PathBuf },
    /// Waveforms only: `{id}.f0`, `{id}.mgc` and `{id}.bap` per id
    WaveformOnly { wav_dir: PathBuf },
}

impl ProcessingMode {
    /// Select the mode from the supplied directories
    ///
    /// Priority: combined when both are given, then label-only, then
    /// waveform-only.
    pub fn from_dirs(lab_dir: Option<&Path>, wav_dir: Option<&Path>) -> ProcessResult<Self> {
        match (lab_dir, wav_dir) {
            (Some(lab), Some(wav)) => Ok(Self::Combined {
                lab_dir: lab.to_path_buf(),
                wav_dir: wav.to_path_buf(),
            }),
            (Some(lab), None) => Ok(Self::LabelOnly {
                lab_dir: lab.to_path_buf(),
            }),
            (None, Some(wav)) => Ok(Self::WaveformOnly {
                wav_dir: wav.to_path_buf(),
            }),
            (None, None) => Err(ProcessError::Config(
                "Nothing to process: provide --lab_dir, --wav_dir, or both".to_string(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Combined { .. } => "combined",
            Self::LabelOnly { .. } => "label-only",
            Self::WaveformOnly { .. } => "waveform-only",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
