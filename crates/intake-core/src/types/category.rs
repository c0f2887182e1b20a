//! Upload category allow-lists.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

/// Allow-lists and size ceiling for one kind of upload (e.g. `images`).
///
/// Extensions are stored lowercase without the leading dot. MIME types are
/// stored lowercase. All lookups are ASCII-case-insensitive.
///
/// # Examples
///
/// ```
/// use intake_core::types::UploadCategory;
///
/// let category = UploadCategory::new("images", [".PNG", "jpg"], ["image/png", "image/jpeg"], 1024);
/// assert!(category.allows_extension("png"));
/// assert!(category.allows_mime_type("IMAGE/PNG"));
/// assert!(!category.allows_extension("gif"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCategory {
    /// Category identifier, also used as the storage directory name.
    pub id: String,

    /// Accepted file extensions.
    pub allowed_extensions: BTreeSet<String>,

    /// Accepted declared MIME types.
    pub allowed_mime_types: BTreeSet<String>,

    /// Maximum file size in bytes.
    pub max_size_bytes: u64,
}

impl UploadCategory {
    /// Creates a category, normalizing extensions and MIME types.
    pub fn new<E, M>(
        id: impl Into<String>,
        extensions: impl IntoIterator<Item = E>,
        mime_types: impl IntoIterator<Item = M>,
        max_size_bytes: u64,
    ) -> Self
    where
        E: AsRef<str>,
        M: AsRef<str>,
    {
        Self {
            id: id.into(),
            allowed_extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            allowed_mime_types: mime_types
                .into_iter()
                .map(|mime| mime.as_ref().trim().to_ascii_lowercase())
                .collect(),
            max_size_bytes,
        }
    }

    /// Returns `true` if the extension (with or without a leading dot) is
    /// allowed.
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Returns `true` if the declared MIME type is allowed.
    #[must_use]
    pub fn allows_mime_type(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim();
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
