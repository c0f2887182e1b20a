//! Upload policy configuration.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::UploadError;
use crate::formats::mime;
use crate::types::UploadCategory;

/// Upload policy with default-deny settings.
///
/// Built once at startup and passed by reference into every component; no
/// component reads policy from global state. Every field has a secure default,
/// so a JSON policy file only needs to name what it changes.
///
/// # Examples
///
/// ```
/// use intake_core::PolicyConfig;
///
/// // Use secure defaults
/// let config = PolicyConfig::default();
/// assert!(config.category("images").is_some());
///
/// // Override selected fields from JSON
/// let custom = PolicyConfig::from_json_str(r#"{ "scan_limit": 4096 }"#).unwrap();
/// assert_eq!(custom.scan_limit, 4096);
/// assert!(custom.is_extension_denied("exe"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Root directory under which category directories are created.
    pub storage_root: PathBuf,

    /// Upload categories, looked up by id.
    pub categories: Vec<UploadCategory>,

    /// Extensions rejected for every category, regardless of allow-lists.
    pub denied_extensions: Vec<String>,

    /// Number of leading bytes read for content scanning.
    pub scan_limit: usize,

    /// Hard on-disk ceiling for archives, tighter than category limits.
    pub archive_max_size: u64,

    /// Ceiling for the summed uncompressed size of an archive's entries.
    pub archive_max_uncompressed_size: u64,

    /// Maximum compression ratio allowed (uncompressed / compressed).
    pub max_compression_ratio: f64,

    /// Declared/detected MIME pairs treated as the same type.
    pub mime_equivalences: Vec<(String, String)>,

    /// MIME type browsers send when they do not know better.
    pub generic_binary_mime: String,

    /// Extensions identifying archive uploads.
    pub archive_extensions: Vec<String>,

    /// MIME types identifying archive uploads.
    pub archive_mime_types: Vec<String>,

    /// Additional script regexes appended to the built-in set.
    pub extra_script_patterns: Vec<String>,
}

impl Default for PolicyConfig {
    /// Creates a `PolicyConfig` with secure default settings.
    ///
    /// Default values:
    /// - `storage_root`: `./uploads`
    /// - `categories`: `documents` (25 MB), `images` (5 MB), `materials`
    ///   (50 MB), `archives` (100 MB), `receipts` (10 MB)
    /// - `denied_extensions`: executables, scripts, server pages, HTML/SVG and
    ///   macro-enabled Office formats
    /// - `scan_limit`: 10 KB
    /// - `archive_max_size`: 50 MB
    /// - `archive_max_uncompressed_size`: 500 MB
    /// - `max_compression_ratio`: 100.0
    /// - `mime_equivalences`: `image/jpeg`≈`image/jpg`,
    ///   `application/zip`≈`application/x-zip-compressed`
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./uploads"),
            categories: default_categories(),
            denied_extensions: to_strings(&[
                "exe", "dll", "com", "bat", "cmd", "scr", "pif", "msi", "msp", "cpl", "vbs",
                "vbe", "js", "jse", "wsf", "wsh", "ps1", "psm1", "sh", "bash", "jar", "class",
                "php", "phtml", "php5", "asp", "aspx", "jsp", "cgi", "pl", "py", "rb", "hta",
                "html", "htm", "xhtml", "svg", "lnk", "reg", "inf", "docm", "dotm", "xlsm",
                "xltm", "xlsb", "pptm", "potm", "ppam",
            ]),
            scan_limit: 10 * 1024,
            archive_max_size: 50 * 1024 * 1024,
            archive_max_uncompressed_size: 500 * 1024 * 1024,
            max_compression_ratio: 100.0,
            mime_equivalences: vec![
                (mime::JPEG.to_string(), mime::JPG.to_string()),
                (mime::ZIP.to_string(), mime::ZIP_COMPRESSED.to_string()),
            ],
            generic_binary_mime: mime::OCTET_STREAM.to_string(),
            archive_extensions: to_strings(&["zip"]),
            archive_mime_types: to_strings(&[mime::ZIP, mime::ZIP_COMPRESSED]),
            extra_script_patterns: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Parses a JSON policy, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidConfig` if the JSON is malformed or the
    /// resulting policy fails [`PolicyConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| UploadError::InvalidConfig(format!("malformed policy JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON policy file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise the errors of
    /// [`PolicyConfig::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidConfig` if there are no categories, a
    /// category id is duplicated or is not a plain directory name, or a limit
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(UploadError::InvalidConfig(
                "at least one category is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if !crate::storage::is_safe_segment(&category.id) {
                return Err(UploadError::InvalidConfig(format!(
                    "category id {:?} is not a plain directory name",
                    category.id
                )));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(UploadError::InvalidConfig(format!(
                    "duplicate category id {:?}",
                    category.id
                )));
            }
        }

        if self.scan_limit == 0 {
            return Err(UploadError::InvalidConfig(
                "scan_limit must be greater than zero".to_string(),
            ));
        }

        if self.max_compression_ratio <= 0.0 {
            return Err(UploadError::InvalidConfig(
                "max_compression_ratio must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Looks up a category by id.
    #[must_use]
    pub fn category(&self, id: &str) -> Option<&UploadCategory> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Looks up a category by id, failing with `UnknownCategory`.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnknownCategory` if no category has this id.
    pub fn require_category(&self, id: &str) -> Result<&UploadCategory> {
        self.category(id).ok_or_else(|| UploadError::UnknownCategory {
            category: id.to_string(),
        })
    }

    /// Returns `true` if the extension is on the global deny-list.
    ///
    /// Comparison is case-insensitive to prevent bypass on case-insensitive
    /// filesystems (Windows, macOS default).
    #[must_use]
    pub fn is_extension_denied(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.denied_extensions
            .iter()
            .any(|denied| denied.eq_ignore_ascii_case(extension))
    }

    /// Returns `true` if the extension identifies an archive.
    #[must_use]
    pub fn is_archive_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.archive_extensions
            .iter()
            .any(|archive| archive.eq_ignore_ascii_case(extension))
    }

    /// Returns `true` if the MIME type identifies an archive.
    #[must_use]
    pub fn is_archive_mime(&self, mime_type: &str) -> bool {
        self.archive_mime_types
            .iter()
            .any(|archive| archive.eq_ignore_ascii_case(mime_type.trim()))
    }

    /// Returns `true` if the MIME type is the generic binary stream type.
    #[must_use]
    pub fn is_generic_binary(&self, mime_type: &str) -> bool {
        self.generic_binary_mime
            .eq_ignore_ascii_case(mime_type.trim())
    }

    /// Returns `true` if two MIME types are equal or listed as equivalent.
    #[must_use]
    pub fn are_equivalent(&self, a: &str, b: &str) -> bool {
        let (a, b) = (a.trim(), b.trim());
        if a.eq_ignore_ascii_case(b) {
            return true;
        }
        self.mime_equivalences.iter().any(|(left, right)| {
            (left.eq_ignore_ascii_case(a) && right.eq_ignore_ascii_case(b))
                || (left.eq_ignore_ascii_case(b) && right.eq_ignore_ascii_case(a))
        })
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

fn default_categories() -> Vec<UploadCategory> {
    const MB: u64 = 1024 * 1024;

    vec![
        UploadCategory::new(
            "documents",
            ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv"],
            [
                mime::PDF,
                mime::DOC,
                mime::DOCX,
                mime::XLS,
                mime::XLSX,
                mime::PPT,
                mime::PPTX,
                mime::TEXT,
                mime::CSV,
            ],
            25 * MB,
        ),
        UploadCategory::new(
            "images",
            ["jpg", "jpeg", "png", "gif", "webp"],
            [mime::JPEG, mime::JPG, mime::PNG, mime::GIF, mime::WEBP],
            5 * MB,
        ),
        UploadCategory::new(
            "materials",
            [
                "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "zip", "jpg", "jpeg",
                "png",
            ],
            [
                mime::PDF,
                mime::DOC,
                mime::DOCX,
                mime::PPT,
                mime::PPTX,
                mime::XLS,
                mime::XLSX,
                mime::TEXT,
                mime::ZIP,
                mime::ZIP_COMPRESSED,
                mime::JPEG,
                mime::JPG,
                mime::PNG,
            ],
            50 * MB,
        ),
        UploadCategory::new(
            "archives",
            ["zip"],
            [mime::ZIP, mime::ZIP_COMPRESSED],
            100 * MB,
        ),
        UploadCategory::new(
            "receipts",
            ["pdf", "jpg", "jpeg", "png"],
            [mime::PDF, mime::JPEG, mime::JPG, mime::PNG],
            10 * MB,
        ),
    ]
}
