//! Error types for upload validation, storage and serving.

use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Result type alias using `UploadError`.
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that can occur while validating, storing or serving an upload.
///
/// Every rejection reason has its own variant so that callers (and audit
/// logs) never have to parse messages to tell them apart.
#[derive(Error, Debug)]
pub enum UploadError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is larger than the category allows.
    #[error("file too large: {size} bytes (max {max} bytes)")]
    SizeExceeded {
        /// Declared or observed size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        max: u64,
    },

    /// Extension is on the global deny-list or missing from the category
    /// allow-list.
    #[error("file extension not allowed: {extension:?}")]
    ExtensionDenied {
        /// Lowercased extension without the leading dot (may be empty).
        extension: String,
    },

    /// Declared MIME type is not accepted by the category.
    #[error("declared MIME type {declared} is not accepted for category {category}")]
    MimeMismatch {
        /// MIME type declared by the client.
        declared: String,
        /// Category identifier.
        category: String,
    },

    /// File bytes contradict the declared type's magic number.
    #[error("file signature does not match declared type {declared}: {detail}")]
    SignatureMismatch {
        /// MIME type declared by the client.
        declared: String,
        /// What the signature check observed.
        detail: String,
    },

    /// An executable or bytecode magic number was found inside the file.
    #[error("embedded executable detected: {format} at offset {offset}")]
    EmbeddedExecutable {
        /// Executable format name.
        format: &'static str,
        /// Byte offset of the first match within the scanned window.
        offset: usize,
    },

    /// Script or active content pattern found.
    #[error("script content detected: {pattern}")]
    ScriptContent {
        /// Name of the pattern that matched.
        pattern: String,
    },

    /// VBA macro marker found in an Office container.
    #[error("macro content detected: {marker}")]
    MacroContent {
        /// Marker that matched.
        marker: String,
    },

    /// Absolute URL, UNC path or `file://` URI found.
    #[error("external reference detected: {reference}")]
    ExternalReference {
        /// The matched reference, truncated for logging.
        reference: String,
    },

    /// Signatures of more than one format found in the same file.
    #[error("polyglot file detected: {}", formats.join(", "))]
    PolyglotDetected {
        /// Distinct formats whose signatures were found.
        formats: Vec<&'static str>,
    },

    /// Archive exceeds the archive-specific size ceiling.
    #[error("archive too large: {size} bytes (max {max} bytes)")]
    ArchiveTooLarge {
        /// Observed size in bytes (on disk or uncompressed total).
        size: u64,
        /// Ceiling in bytes.
        max: u64,
    },

    /// Archive compression ratio exceeds the configured maximum.
    #[error(
        "potential zip bomb: compressed={compressed} bytes, uncompressed={uncompressed} bytes (ratio: {ratio:.2})"
    )]
    ZipBomb {
        /// Compressed size in bytes.
        compressed: u64,
        /// Uncompressed size in bytes.
        uncompressed: u64,
        /// Compression ratio.
        ratio: f64,
    },

    /// Container claims to be a ZIP archive but cannot be read as one.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Detected content type differs from the declared type.
    #[error("detected type {} does not match declared type {declared}", detected.as_deref().unwrap_or("unknown"))]
    TypeMismatch {
        /// MIME type declared by the client.
        declared: String,
        /// MIME type detected from the bytes, if any.
        detected: Option<String>,
    },

    /// Path resolves outside its permitted root.
    #[error("path escapes storage root: {path}")]
    ContainmentViolation {
        /// The offending path.
        path: PathBuf,
    },

    /// Requested file does not exist or is not a regular file.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// Category identifier is not configured.
    #[error("unknown upload category: {category}")]
    UnknownCategory {
        /// Requested category identifier.
        category: String,
    },

    /// Policy configuration is invalid.
    #[error("invalid policy configuration: {0}")]
    InvalidConfig(String),
}

impl UploadError {
    /// Returns a stable machine-readable code for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_core::UploadError;
    ///
    /// let err = UploadError::SizeExceeded { size: 10, max: 5 };
    /// assert_eq!(err.reason_code(), "SIZE_EXCEEDED");
    /// ```
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::SizeExceeded { .. } => "SIZE_EXCEEDED",
            Self::ExtensionDenied { .. } => "EXTENSION_DENIED",
            Self::MimeMismatch { .. } => "MIME_MISMATCH",
            Self::SignatureMismatch { .. } => "SIGNATURE_MISMATCH",
            Self::EmbeddedExecutable { .. } => "EMBEDDED_EXECUTABLE",
            Self::ScriptContent { .. } => "SCRIPT_CONTENT",
            Self::MacroContent { .. } => "MACRO_CONTENT",
            Self::ExternalReference { .. } => "EXTERNAL_REFERENCE",
            Self::PolyglotDetected { .. } => "POLYGLOT_DETECTED",
            Self::ArchiveTooLarge { .. } => "ARCHIVE_TOO_LARGE",
            Self::ZipBomb { .. } => "ZIP_BOMB",
            Self::InvalidArchive(_) => "INVALID_ARCHIVE",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::ContainmentViolation { .. } => "CONTAINMENT_VIOLATION",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }

    /// Returns `true` for rejections decided from declared metadata alone.
    #[must_use]
    pub const fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::SizeExceeded { .. } | Self::ExtensionDenied { .. } | Self::MimeMismatch { .. }
        )
    }

    /// Returns `true` for rejections decided by inspecting the file bytes.
    #[must_use]
    pub const fn is_content_violation(&self) -> bool {
        matches!(
            self,
            Self::SignatureMismatch { .. }
                | Self::EmbeddedExecutable { .. }
                | Self::ScriptContent { .. }
                | Self::MacroContent { .. }
                | Self::ExternalReference { .. }
                | Self::PolyglotDetected { .. }
                | Self::ArchiveTooLarge { .. }
                | Self::ZipBomb { .. }
                | Self::InvalidArchive(_)
                | Self::TypeMismatch { .. }
        )
    }

    /// Returns `true` if this error represents a security violation.
    ///
    /// Security violations are every policy or content rejection plus
    /// serve-time containment violations. I/O failures, missing files and
    /// configuration problems are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_core::UploadError;
    /// use std::path::PathBuf;
    ///
    /// let err = UploadError::ContainmentViolation {
    ///     path: PathBuf::from("../etc/passwd"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = UploadError::UnknownCategory { category: "x".into() };
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        self.is_policy_violation()
            || self.is_content_violation()
            || matches!(self, Self::ContainmentViolation { .. })
    }

    /// Maps this error to the HTTP status a route layer should answer with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SizeExceeded { .. } | Self::ArchiveTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::ExtensionDenied { .. } | Self::MimeMismatch { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::SignatureMismatch { .. }
            | Self::EmbeddedExecutable { .. }
            | Self::ScriptContent { .. }
            | Self::MacroContent { .. }
            | Self::ExternalReference { .. }
            | Self::PolyglotDetected { .. }
            | Self::ZipBomb { .. }
            | Self::InvalidArchive(_)
            | Self::TypeMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ContainmentViolation { .. } => StatusCode::FORBIDDEN,
            Self::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Self::UnknownCategory { .. } => StatusCode::BAD_REQUEST,
            Self::Io(_) | Self::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
