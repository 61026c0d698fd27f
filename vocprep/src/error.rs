//! Error types for vocprep
//!
//! Three classes reach the process boundary: configuration errors (missing
//! inputs, mismatched id sets), I/O errors naming the offending path, and
//! parse/extraction errors from the label and vocoder backends. None are
//! caught inside a run.

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::label::LabelError;
use crate::vocoder::ExtractionError;

/// Batch processing error
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Invalid or inconsistent run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input path could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output path could not be written
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: vocprep_common::Error,
    },

    /// Label parsing or binarization failed
    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    /// Waveform decoding or analysis failed
    #[error("Feature extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Feature archive encoding or decoding failed
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// vocprep-common error
    #[error("Common error: {0}")]
    Common(#[from] vocprep_common::Error),
}

/// Result type for batch processing
pub type ProcessResult<T> = Result<T, ProcessError>;
