//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Create a temp file next to `dest` so it can be renamed into place.
pub fn temp_file_beside(dest: &Path) -> io::Result<NamedTempFile> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(dir)?;
    NamedTempFile::new_in(dir)
}

/// Write bytes to `dest` atomically (temp file + rename).
pub fn write_atomic(dest: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = temp_file_beside(dest)?;
    io::Write::write_all(&mut tmp, contents)?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Total size in bytes and file count of a directory tree.
pub fn dir_size(path: &Path) -> (u64, usize) {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .fold((0, 0), |(bytes, count), m| (bytes + m.len(), count + 1))
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
