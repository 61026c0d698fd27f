//! HTS alignment label backend
//!
//! Parses forced-alignment label files, counts frames at the configured
//! frame shift, and binarizes each frame as question answers followed by
//! frame-position features.
//!
//! **Frame-position features**
//! - State level (5): position in state, position in phone, state index
//!   normalised to [0, 1], state length in frames, phone length in frames
//! - Phone level (2): position in phone, phone length in frames
//!
//! Positions are frame centres, `(i + 0.5) / length`.

pub mod alignment;
pub mod questions;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use vocprep_common::config::LabelConfig;

use crate::types::{FeatureMatrix, Label, LabelLoader};
use alignment::{parse_alignment, Segment};
pub use questions::QuestionSet;

/// Position features appended per frame for state-level labels
pub const STATE_POSITION_FEATURES: usize = 5;

/// Position features appended per frame for phone-level labels
pub const PHONE_POSITION_FEATURES: usize = 2;

/// Label parsing errors
#[derive(Debug, Error)]
pub enum LabelError {
    /// Label or question file could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed alignment line
    #[error("{path} line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Malformed question file line
    #[error("Question file {path} line {line}: {reason}")]
    Questions {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Invalid loader parameters
    #[error("Invalid label parameters: {0}")]
    InvalidParameters(String),
}

/// One phone: its full-context name and per-state frame counts
#[derive(Debug, Clone, PartialEq)]
struct Phone {
    name: String,
    /// `(state index, frames)`; a single `(0, frames)` entry at phone level
    states: Vec<(usize, usize)>,
}

impl Phone {
    fn frames(&self) -> usize {
        self.states.iter().map(|(_, frames)| frames).sum()
    }
}

/// Parsed HTS alignment
#[derive(Debug, Clone)]
pub struct HtsLabel {
    phones: Vec<Phone>,
    state_level: bool,
    states_per_phone: usize,
    questions: Arc<QuestionSet>,
}

impl HtsLabel {
    /// Build from parsed segments
    fn from_segments(
        segments: Vec<Segment>,
        frame_shift_units: f64,
        state_level: bool,
        states_per_phone: usize,
        questions: Arc<QuestionSet>,
    ) -> Self {
        let mut phones: Vec<Phone> = Vec::new();
        let mut last_state: Option<usize> = None;

        for segment in segments {
            let frames =
                ((segment.end - segment.start) as f64 / frame_shift_units).round() as usize;
            let state = segment.state.unwrap_or(0);

            // A phone ends when the name changes or the state index stops increasing
            let continues_phone = state_level
                && matches!(phones.last(), Some(p) if p.name == segment.name)
                && matches!(last_state, Some(prev) if state > prev);

            if continues_phone {
                if let Some(phone) = phones.last_mut() {
                    phone.states.push((state, frames));
                }
            } else {
                phones.push(Phone {
                    name: segment.name,
                    states: vec![(state, frames)],
                });
            }
            last_state = Some(state);
        }

        Self {
            phones,
            state_level,
            states_per_phone,
            questions,
        }
    }

    /// Number of phones in the alignment
    pub fn phone_count(&self) -> usize {
        self.phones.len()
    }

    /// Columns produced by [`Label::binarize`]
    pub fn dimension(&self) -> usize {
        let position = if self.state_level {
            STATE_POSITION_FEATURES
        } else {
            PHONE_POSITION_FEATURES
        };
        self.questions.len() + position
    }
}

impl Label for HtsLabel {
    fn binarize(&self, context: &str) -> Result<FeatureMatrix, LabelError> {
        let dim = self.dimension();
        let mut data = Vec::with_capacity(self.count_frames() * dim);
        let state_norm = self.states_per_phone.saturating_sub(1).max(1) as f32;

        for phone in &self.phones {
            let full_context = format!("{}{}", phone.name, context);
            let answers = self.questions.answer_all(&full_context);
            let phone_frames = phone.frames();
            let mut phone_offset = 0usize;

            for &(state, state_frames) in &phone.states {
                for i in 0..state_frames {
                    data.extend_from_slice(&answers);
                    let pos_in_phone = (phone_offset + i) as f32 + 0.5;
                    if self.state_level {
                        data.push((i as f32 + 0.5) / state_frames as f32);
                        data.push(pos_in_phone / phone_frames as f32);
                        data.push(state as f32 / state_norm);
                        data.push(state_frames as f32);
                        data.push(phone_frames as f32);
                    } else {
                        data.push(pos_in_phone / phone_frames as f32);
                        data.push(phone_frames as f32);
                    }
                }
                phone_offset += state_frames;
            }
        }

        let rows = data.len() / dim;
        FeatureMatrix::from_vec(rows, dim, data).ok_or_else(|| {
            LabelError::InvalidParameters("binarized label has a ragged shape".to_string())
        })
    }

    fn count_frames(&self) -> usize {
        self.phones.iter().map(Phone::frames).sum()
    }
}

/// Builds [`HtsLabel`]s with a fixed level flag, frame shift and question set
#[derive(Debug, Clone)]
pub struct HtsLabelLoader {
    state_level: bool,
    states_per_phone: usize,
    /// Frame shift in 100 ns label time units
    frame_shift_units: f64,
    questions: Arc<QuestionSet>,
}

impl HtsLabelLoader {
    pub fn new(
        state_level: bool,
        states_per_phone: usize,
        frame_shift_ms: f64,
        questions: QuestionSet,
    ) -> Result<Self, LabelError> {
        if !(frame_shift_ms > 0.0) {
            return Err(LabelError::InvalidParameters(format!(
                "frame shift must be positive, got {} ms",
                frame_shift_ms
            )));
        }
        if states_per_phone == 0 {
            return Err(LabelError::InvalidParameters(
                "states per phone must be at least 1".to_string(),
            ));
        }
        if questions.is_empty() {
            tracing::warn!(
                "No questions loaded; binarized labels hold frame-position features only"
            );
        }

        Ok(Self {
            state_level,
            states_per_phone,
            frame_shift_units: frame_shift_ms * 10_000.0,
            questions: Arc::new(questions),
        })
    }

    /// Build from the `[label]` config section, loading its question file
    pub fn from_config(config: &LabelConfig, frame_shift_ms: f64) -> Result<Self, LabelError> {
        let questions = match &config.question_file {
            Some(path) => {
                let questions = QuestionSet::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    questions = questions.len(),
                    "Loaded question set"
                );
                questions
            }
            None => QuestionSet::empty(),
        };

        Self::new(
            config.state_level,
            config.states_per_phone,
            frame_shift_ms,
            questions,
        )
    }

    /// Parse alignment text directly; `path` is used in error messages only
    pub fn parse(&self, content: &str, path: &Path) -> Result<HtsLabel, LabelError> {
        let segments = parse_alignment(content, path, self.state_level, self.states_per_phone)?;
        Ok(HtsLabel::from_segments(
            segments,
            self.frame_shift_units,
            self.state_level,
            self.states_per_phone,
            Arc::clone(&self.questions),
        ))
    }
}

impl LabelLoader for HtsLabelLoader {
    type Label = HtsLabel;

    fn load(&self, path: &Path) -> Result<HtsLabel, LabelError> {
        let content = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&content, path)
    }
}
