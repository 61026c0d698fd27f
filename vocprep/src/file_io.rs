//! Output savers and input loaders
//!
//! Binary outputs are raw little-endian `f32`, row-major, with no header
//! (the layout `numpy.ndarray.tofile` produces). Every save goes through an
//! atomic temp-file-and-rename write.

use std::fmt::Display;
use std::path::Path;

use vocprep_common::fs::write_atomic;

use crate::archive::FeatureArchive;
use crate::error::{ProcessError, ProcessResult};
use crate::types::FeatureMatrix;

/// Write a feature archive
pub fn save_proto(archive: &FeatureArchive, path: &Path) -> ProcessResult<()> {
    write(path, &archive.encode())
}

/// Write a value as text followed by a newline
pub fn save_txt<T: Display>(value: &T, path: &Path) -> ProcessResult<()> {
    write(path, format!("{}\n", value).as_bytes())
}

/// Write a matrix as raw little-endian `f32`
pub fn save_bin(matrix: &FeatureMatrix, path: &Path) -> ProcessResult<()> {
    let mut bytes = Vec::with_capacity(matrix.as_slice().len() * 4);
    for value in matrix.as_slice() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    write(path, &bytes)
}

/// Read a text file as lines
pub fn load_txt(path: &Path) -> ProcessResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(str::to_owned).collect())
}

/// Read a feature archive written by [`save_proto`]
pub fn load_proto(path: &Path) -> ProcessResult<FeatureArchive> {
    let bytes = std::fs::read(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FeatureArchive::decode(&bytes)?)
}

/// Read a raw `f32` file written by [`save_bin`]; the column count is not stored
pub fn load_bin(path: &Path, cols: usize) -> ProcessResult<FeatureMatrix> {
    let bytes = std::fs::read(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() % 4 != 0 {
        return Err(ProcessError::Config(format!(
            "{} is not a whole number of f32 values ({} bytes)",
            path.display(),
            bytes.len()
        )));
    }

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    if cols == 0 || values.len() % cols != 0 {
        return Err(ProcessError::Config(format!(
            "{} holds {} values, not divisible into rows of {}",
            path.display(),
            values.len(),
            cols
        )));
    }

    let rows = values.len() / cols;
    FeatureMatrix::from_vec(rows, cols, values).ok_or_else(|| {
        ProcessError::Config(format!("{} has an inconsistent shape", path.display()))
    })
}

fn write(path: &Path, bytes: &[u8]) -> ProcessResult<()> {
    write_atomic(path, bytes).map_err(|source| ProcessError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_txt_writes_value_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("p.dur");

        save_txt(&42usize, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "42\n");
    }

    #[test]
    fn test_save_bin_is_little_endian_row_major() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("p.mgc");
        let matrix = FeatureMatrix::from_rows(2, vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

        save_bin(&matrix, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[4..8], &2.0f32.to_le_bytes());
        assert_eq!(load_bin(&path, 2).unwrap(), matrix);
    }

    #[test]
    fn test_load_bin_rejects_ragged_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("p.bap");
        std::fs::write(&path, [0u8; 12]).unwrap();

        assert!(load_bin(&path, 2).is_err());
    }

    #[test]
    fn test_write_into_missing_dir_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope").join("p.dur");

        match save_txt(&1, &path) {
            Err(ProcessError::Write { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected write error, got {:?}", other),
        }
    }
}
