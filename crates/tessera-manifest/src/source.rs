//! Sources of manifest bytes.
//!
//! The manifest producer is an external build step. A [`ManifestSource`]
//! only has to hand back the bytes it wrote.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ManifestResult;

/// Supplies the raw bytes of a manifest.
pub trait ManifestSource: Send + Sync {
    /// Read the complete manifest.
    fn read_manifest(&self) -> ManifestResult<Vec<u8>>;

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// A manifest held in memory.
#[derive(Clone, Debug)]
pub struct BytesSource {
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl ManifestSource for BytesSource {
    fn read_manifest(&self) -> ManifestResult<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}

/// A manifest file on disk, re-read on every call.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestSource for FileSource {
    fn read_manifest(&self) -> ManifestResult<Vec<u8>> {
        let bytes = std::fs::read(&self.path)?;
        debug!(path = %self.path.display(), len = bytes.len(), "read manifest file");
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManifestError;

    #[test]
    fn bytes_source_returns_its_bytes() {
        let source = BytesSource::new(b"{}".to_vec());
        assert_eq!(source.read_manifest().unwrap(), b"{}");
        assert!(source.describe().contains("2 bytes"));
    }

    #[test]
    fn file_source_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, b"content").unwrap();

        let source = FileSource::new(&path);
        assert_eq!(source.read_manifest().unwrap(), b"content");
        assert_eq!(source.path(), path.as_path());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("absent.json"));
        let err = source.read_manifest().unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
        assert!(!err.is_corrupt());
    }
}
