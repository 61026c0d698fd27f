//! Label/waveform pairing check for combined mode

use crate::error::{ProcessError, ProcessResult};
use crate::types::FileId;

/// Require the label ids and waveform ids to be the same sequence
///
/// Comparison is positional: the same ids in a different order are a
/// mismatch. Runs before any file is opened.
pub fn validate_pairing(
    label_ids: Vec<FileId>,
    wav_ids: Vec<FileId>,
) -> ProcessResult<Vec<FileId>> {
    if label_ids == wav_ids {
        return Ok(label_ids);
    }

    let first_difference = label_ids
        .iter()
        .zip(wav_ids.iter())
        .position(|(lab, wav)| lab != wav)
        .unwrap_or_else(|| label_ids.len().min(wav_ids.len()));

    let describe = |ids: &[FileId]| {
        ids.get(first_difference)
            .map(|id| format!("'{}'", id))
            .unwrap_or_else(|| "<end>".to_string())
    };

    Err(ProcessError::Config(format!(
        "Please provide id_list, or ensure that wav_dir and lab_dir contain the same files. \
         ({} label ids, {} wav ids; first difference at position {}: lab {} vs wav {})",
        label_ids.len(),
        wav_ids.len(),
        first_difference,
        describe(&label_ids),
        describe(&wav_ids),
    )))
}
