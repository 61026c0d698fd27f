//! Atomic file operations (temp + rename)

use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `bytes` to `target` so readers see either the old file or the full new one
///
/// Data goes to `{target}.tmp` in the same directory, is flushed to disk,
/// then renamed over `target`. The temp file is removed if any step fails.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(target);

    let result = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, target)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Create `dir` and its parents if missing
pub fn ensure_directory_exists(dir: &Path) -> Result<()> {
    if !dir.exists() {
        tracing::info!("Creating output directory: {}", dir.display());
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}
