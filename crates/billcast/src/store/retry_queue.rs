//! Retry queue persistence.

use std::path::{Path, PathBuf};

use super::{read_optional, write_atomic};
use crate::congress::Bill;
use crate::error::StoreError;

/// File-backed list of bills whose last publish attempt failed.
///
/// Stored as a JSON array in upstream bill shape. Entries are kept in order
/// and are not deduplicated.
#[derive(Debug, Clone)]
pub struct RetryQueue {
    path: PathBuf,
}

impl RetryQueue {
    /// Create a queue backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load pending bills.
    ///
    /// Missing or corrupt files yield an empty queue. Entries that aren't
    /// bills are dropped individually.
    pub fn load(&self) -> Vec<Bill> {
        let bytes = match read_optional(&self.path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable retry queue, starting empty");
                return Vec::new();
            }
        };

        let entries = match serde_json::from_slice::<Vec<serde_json::Value>>(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt retry queue, starting empty");
                return Vec::new();
            }
        };

        let mut bills = Vec::with_capacity(entries.len());
        for (index, raw) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Bill>(raw) {
                Ok(bill) => bills.push(bill),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), index, error = %e, "Dropping malformed retry entry");
                }
            }
        }

        tracing::debug!(path = %self.path.display(), pending = bills.len(), "Loaded retry queue");
        bills
    }

    /// Replace the queue with `bills`.
    pub fn save(&self, bills: &[Bill]) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(bills)?;
        write_atomic(&self.path, &content)?;
        tracing::debug!(path = %self.path.display(), pending = bills.len(), "Saved retry queue");
        Ok(())
    }
}
