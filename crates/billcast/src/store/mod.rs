//! Durable relay state.
//!
//! Two small files under the data directory: the watermark (`last_seen`) and
//! the retry queue (`errored`). Both are read once at the start of a cycle and
//! overwritten once at the end. A missing or unreadable file is treated as
//! empty state, never as an error.

mod retry_queue;
mod watermark;

pub use retry_queue::RetryQueue;
pub use watermark::{Watermark, WatermarkStore};

use std::io::Write;
use std::path::Path;

use crate::error::StoreError;

/// File name of the watermark inside the data directory.
pub const WATERMARK_FILE: &str = "last_seen";

/// File name of the retry queue inside the data directory.
pub const RETRY_QUEUE_FILE: &str = "errored";

/// Replace `path` with `contents` via a synced temp file and a rename, so a
/// reader never observes a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    file.write_all(contents)
        .map_err(|e| StoreError::io(path, e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    file.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;

    Ok(())
}

/// Read a state file, mapping "does not exist" to `None`.
pub(crate) fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // Only the target remains, no stray temp files
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_read_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_optional(&dir.path().join("absent")).unwrap().is_none());
    }
}
