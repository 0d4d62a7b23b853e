//! Watermark persistence.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

use super::{read_optional, write_atomic};
use crate::error::StoreError;

/// Update timestamp of the newest bill seen so far.
///
/// Keeps the upstream string verbatim (it is sent back as `fromDateTime`)
/// alongside its parsed value for comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    raw: String,
    at: DateTime<Utc>,
}

impl Watermark {
    /// Parse an RFC 3339 timestamp. Surrounding whitespace is ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let at = DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc);
        Some(Self {
            raw: raw.to_string(),
            at,
        })
    }

    /// The timestamp exactly as received from congress.gov.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed instant.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialOrd for Watermark {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Watermark {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).then_with(|| self.raw.cmp(&other.raw))
    }
}

/// File-backed watermark store.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored watermark.
    ///
    /// Returns `None` on first run and when the file can't be read or doesn't
    /// hold a timestamp.
    pub fn load(&self) -> Option<Watermark> {
        let bytes = match read_optional(&self.path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "No watermark stored yet");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable watermark, starting fresh");
                return None;
            }
        };

        let Ok(text) = String::from_utf8(bytes) else {
            tracing::warn!(path = %self.path.display(), "Watermark is not UTF-8, starting fresh");
            return None;
        };

        let watermark = Watermark::parse(&text);
        if watermark.is_none() {
            tracing::warn!(
                path = %self.path.display(),
                value = %text.trim(),
                "Watermark is not a timestamp, starting fresh"
            );
        }
        watermark
    }

    /// Persist `watermark`, replacing any previous value.
    pub fn save(&self, watermark: &Watermark) -> Result<(), StoreError> {
        write_atomic(&self.path, watermark.as_str().as_bytes())?;
        tracing::debug!(path = %self.path.display(), watermark = %watermark, "Saved watermark");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let w = Watermark::parse(" 2024-01-01T00:00:00Z\n").unwrap();
        assert_eq!(w.as_str(), "2024-01-01T00:00:00Z");
        assert!(Watermark::parse("").is_none());
        assert!(Watermark::parse("yesterday").is_none());
    }

    #[test]
    fn test_ordering_uses_instant() {
        let earlier = Watermark::parse("2024-01-01T05:00:00+05:00").unwrap();
        let later = Watermark::parse("2024-01-01T01:00:00Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path().join("last_seen"));

        assert!(store.load().is_none());

        let w = Watermark::parse("2024-01-01T00:00:00Z").unwrap();
        store.save(&w).unwrap();
        assert_eq!(store.load(), Some(w));
        // Raw string on disk, nothing else
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_seen");
        let store = WatermarkStore::new(&path);

        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(store.load().is_none());

        std::fs::write(&path, "not a timestamp").unwrap();
        assert!(store.load().is_none());

        std::fs::write(&path, "").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_directory_in_place_of_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());
        assert!(store.load().is_none());
    }
}
