//! Filesystem utilities for the file-backed document store.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::StorageError;

/// Reads the entire contents of a file, `None` if it does not exist.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path.as_ref()) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Writes data to a file atomically.
///
/// Writes to a temporary sibling first, then renames it over the target, so
/// readers see either the old document or the new one.
pub fn write_file_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), StorageError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = {
        let mut temp = path.to_path_buf();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "temp".to_string());
        temp.set_file_name(format!(".{}.tmp", file_name));
        temp
    };

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}
