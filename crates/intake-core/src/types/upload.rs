//! Boundary types for staged and stored uploads.

use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

/// An upload as handed over by the transport layer.
///
/// The bytes are already on disk at `staged_path`. Every other field is
/// client-controlled and therefore untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Filename as sent by the client.
    pub original_name: String,

    /// MIME type as sent by the client.
    pub declared_mime_type: String,

    /// Size in bytes as reported by the transport.
    pub size_bytes: u64,

    /// Where the transport wrote the bytes.
    pub staged_path: PathBuf,
}

impl UploadedFile {
    /// Creates an `UploadedFile` from transport metadata.
    pub fn new(
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        size_bytes: u64,
        staged_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            declared_mime_type: declared_mime_type.into(),
            size_bytes,
            staged_path: staged_path.into(),
        }
    }

    /// Builds an `UploadedFile` whose size is read from the staged file.
    ///
    /// # Errors
    ///
    /// Returns an error if the staged file's metadata cannot be read.
    pub fn from_staged(
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        staged_path: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let staged_path = staged_path.into();
        let size_bytes = std::fs::metadata(&staged_path)?.len();
        Ok(Self::new(
            original_name,
            declared_mime_type,
            size_bytes,
            staged_path,
        ))
    }
}

/// Directory and filename allocated for a new upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSlot {
    /// Owner-restricted directory (`root/category[/user]`).
    pub directory: PathBuf,

    /// Unique stored filename.
    pub stored_filename: String,
}

impl StorageSlot {
    /// Returns the full path of the slot.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.stored_filename)
    }
}

/// A file that passed every check and was retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Category the file was stored under.
    pub category: String,

    /// Full path of the stored file.
    pub stored_path: PathBuf,

    /// Generated filename (last component of `stored_path`).
    pub stored_filename: String,
}

impl StoredFile {
    /// Returns the stored path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.stored_path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_slot_path_joins_components() {
        let slot = StorageSlot {
            directory: PathBuf::from("/srv/uploads/images"),
            stored_filename: "images_1_ab_photo.png".to_string(),
        };
        assert_eq!(
            slot.path(),
            PathBuf::from("/srv/uploads/images/images_1_ab_photo.png")
        );
    }

    #[test]
    fn test_from_staged_reads_size() {
        let temp = TempDir::new().unwrap();
        let staged = temp.path().join("upload.bin");
        std::fs::write(&staged, b"12345").unwrap();

        let file = UploadedFile::from_staged("a.txt", "text/plain", &staged).unwrap();
        assert_eq!(file.size_bytes, 5);
        assert_eq!(file.staged_path, staged);
    }

    #[test]
    fn test_from_staged_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = UploadedFile::from_staged("a.txt", "text/plain", temp.path().join("nope"));
        assert!(result.is_err());
    }
}
