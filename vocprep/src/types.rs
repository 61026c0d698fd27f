//! Core types and collaborator traits
//!
//! The per-id processors only ever see these traits. The HTS label backend
//! ([`crate::label`]) and the vocoder backend ([`crate::vocoder`]) are the
//! shipped implementations; tests substitute their own.

use std::fmt;
use std::path::Path;

use crate::label::LabelError;
use crate::vocoder::ExtractionError;

// ============================================================================
// Common Types
// ============================================================================

/// Basename shared by a label file, a waveform file, or both
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(String);

impl FileId {
    /// Create a file id
    ///
    /// Rejects empty names and names containing a path separator, since the
    /// id is joined onto input and output directories.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() {
            return Err("file id is empty".to_string());
        }
        if id.contains('/') || id.contains('\\') {
            return Err(format!("file id '{}' contains a path separator", id));
        }
        if id == "." || id == ".." {
            return Err(format!("file id '{}' is not a basename", id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row-major `f32` matrix: one row per frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Build a matrix from row-major data; `data.len()` must equal `rows * cols`
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Build a matrix from rows of equal length
    pub fn from_rows(cols: usize, rows: impl IntoIterator<Item = Vec<f32>>) -> Option<Self> {
        let mut data = Vec::new();
        let mut count = 0;
        for row in rows {
            if row.len() != cols {
                return None;
            }
            data.extend_from_slice(&row);
            count += 1;
        }
        Some(Self {
            rows: count,
            cols,
            data,
        })
    }

    /// Single-column matrix, e.g. an f0 track
    pub fn column(values: Vec<f32>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        Some(&self.data[index * self.cols..(index + 1) * self.cols])
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Vocoder parameter streams for one waveform, aligned frame for frame
#[derive(Debug, Clone, PartialEq)]
pub struct VocoderFeatures {
    /// Fundamental frequency in Hz, one column, 0 for unvoiced frames
    pub f0: FeatureMatrix,
    /// Mel-cepstral spectral envelope, `mgc_order + 1` columns
    pub mgc: FeatureMatrix,
    /// Band aperiodicity in dB, one column per coarse band
    pub bap: FeatureMatrix,
}

impl VocoderFeatures {
    pub fn frame_count(&self) -> usize {
        self.f0.rows()
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Parsed alignment label for one utterance
pub trait Label {
    /// Per-frame binary linguistic features
    ///
    /// `context` is appended to every full-context label before questions are
    /// asked; the processors pass an empty context.
    fn binarize(&self, context: &str) -> Result<FeatureMatrix, LabelError>;

    /// Number of frames the alignment spans
    fn count_frames(&self) -> usize;
}

/// Builds [`Label`]s from label files
pub trait LabelLoader {
    type Label: Label;

    fn load(&self, path: &Path) -> Result<Self::Label, LabelError>;
}

/// Parsed waveform for one utterance
pub trait Wav {
    fn extract_features(&self) -> Result<VocoderFeatures, ExtractionError>;
}

/// Builds [`Wav`]s from waveform files
pub trait WavLoader {
    type Wav: Wav;

    fn load(&self, path: &Path) -> Result<Self::Wav, ExtractionError>;
}
