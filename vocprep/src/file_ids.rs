//! File-id resolution
//!
//! Determines the basenames to process, either by listing a directory for
//! files with a given suffix or by reading an explicit id list.

use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{ProcessError, ProcessResult};
use crate::file_io;
use crate::types::FileId;

/// Suffix of alignment label inputs
pub const LABEL_SUFFIX: &str = ".lab";

/// Suffix of waveform inputs
///
/// The preprocessing scripts this tool replaces scanned the waveform
/// directory for `.lab` as well, which only finds ids when labels sit next to
/// the waveforms. Waveform directories are scanned for `.wav` instead.
pub const WAV_SUFFIX: &str = ".wav";

/// Resolve the ids to process
///
/// Without `id_list`, regular files in `dir` ending in `suffix` are kept and
/// the suffix stripped. Directory listing order is filesystem dependent, so
/// the result is sorted by byte value.
///
/// With `id_list`, ids are read from the file in file order and `dir` is not
/// consulted.
///
/// # Errors
/// * `Read` if the directory or list file cannot be read
/// * `Config` if the list contains an invalid or duplicate id
pub fn resolve_file_ids(
    dir: &Path,
    suffix: &str,
    id_list: Option<&Path>,
) -> ProcessResult<Vec<FileId>> {
    let ids = match id_list {
        Some(list_path) => load_id_list(list_path)?,
        None => scan_dir(dir, suffix)?,
    };

    tracing::debug!(
        dir = %dir.display(),
        count = ids.len(),
        from_list = id_list.is_some(),
        "Resolved file ids"
    );

    Ok(ids)
}

fn scan_dir(dir: &Path, suffix: &str) -> ProcessResult<Vec<FileId>> {
    let read_err = |e: walkdir::Error| ProcessError::Read {
        path: dir.to_path_buf(),
        source: e.into(),
    };

    // Top level only; symlinked inputs count as files
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    let mut ids = Vec::new();
    for entry in walker {
        let entry = entry.map_err(read_err)?;
        if !entry.file_type().is_file() {
            continue;
        }

        // Non-UTF-8 names cannot carry a valid id
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };

        if let Some(stem) = name.strip_suffix(suffix) {
            if stem.is_empty() {
                continue;
            }
            ids.push(FileId::new(stem).map_err(ProcessError::Config)?);
        }
    }

    ids.sort();
    Ok(ids)
}

fn load_id_list(list_path: &Path) -> ProcessResult<Vec<FileId>> {
    let lines = file_io::load_txt(list_path)?;

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(lines.len());
    for (line_no, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let id = FileId::new(line).map_err(|e| {
            ProcessError::Config(format!(
                "{} line {}: {}",
                list_path.display(),
                line_no + 1,
                e
            ))
        })?;

        if !seen.insert(id.clone()) {
            return Err(ProcessError::Config(format!(
                "{} line {}: duplicate file id '{}'",
                list_path.display(),
                line_no + 1,
                id
            )));
        }
        ids.push(id);
    }

    Ok(ids)
}
