//! Error conversion utilities for CLI.
//!
//! Converts intake-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use intake_core::UploadError;
use std::path::Path;

/// Converts `UploadError` to user-friendly anyhow error with context
pub fn convert_upload_error(err: UploadError, file: &Path) -> anyhow::Error {
    let code = err.reason_code();
    match err {
        UploadError::SizeExceeded { size, max } => {
            anyhow!(
                "Upload '{}' rejected [{code}]: {size} bytes exceeds the {max} byte limit\n\
                 HINT: Choose a category with a higher limit or raise max_size_bytes in the policy file.",
                file.display()
            )
        }
        UploadError::ExtensionDenied { extension } => {
            anyhow!(
                "Upload '{}' rejected [{code}]: extension {extension:?} is not allowed\n\
                 HINT: Extensions on the global deny-list cannot be enabled per category.",
                file.display()
            )
        }
        UploadError::MimeMismatch { declared, category } => {
            anyhow!(
                "Upload '{}' rejected [{code}]: {declared} is not accepted for category {category}\n\
                 HINT: Run `intake policy` to list the MIME types each category accepts.",
                file.display()
            )
        }
        UploadError::SignatureMismatch { .. } | UploadError::TypeMismatch { .. } => {
            anyhow!(
                "Security violation: '{}' does not match its declared type [{code}]: {err}\n\
                 HINT: The content contradicts the declared MIME type. Do not trust this file.",
                file.display()
            )
        }
        UploadError::EmbeddedExecutable { .. }
        | UploadError::ScriptContent { .. }
        | UploadError::MacroContent { .. }
        | UploadError::ExternalReference { .. }
        | UploadError::PolyglotDetected { .. } => {
            anyhow!(
                "Security violation: '{}' carries dangerous content [{code}]: {err}\n\
                 HINT: This file may be malicious. Run `intake scan --all` to list every finding.",
                file.display()
            )
        }
        UploadError::ZipBomb {
            compressed,
            uncompressed,
            ratio,
        } => {
            anyhow!(
                "Security violation: '{}' appears to be a zip bomb [{code}]\n\
                 Compression ratio: {ratio:.0}:1 ({}KB → {}MB)\n\
                 HINT: Raise max_compression_ratio in the policy file if the archive is legitimate.",
                file.display(),
                compressed / 1024,
                uncompressed / 1024 / 1024
            )
        }
        UploadError::ArchiveTooLarge { size, max } => {
            anyhow!(
                "Archive '{}' rejected [{code}]: {size} bytes exceeds the {max} byte ceiling\n\
                 HINT: Adjust archive_max_size or archive_max_uncompressed_size in the policy file.",
                file.display()
            )
        }
        UploadError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}' [{code}]: {reason}\n\
                 HINT: The archive may be corrupted or malformed.",
                file.display()
            )
        }
        UploadError::ContainmentViolation { path } => {
            anyhow!(
                "Security violation: '{}' resolves outside the storage root [{code}]\n\
                 HINT: Only files under --root (or the policy's storage_root) can be served.",
                path.display()
            )
        }
        UploadError::FileNotFound { path } => {
            anyhow!(
                "File not found: '{}' [{code}]\n\
                 HINT: Relative serve paths are resolved against the storage root.",
                path.display()
            )
        }
        UploadError::UnknownCategory { category } => {
            anyhow!(
                "Unknown upload category '{category}' [{code}]\n\
                 HINT: Run `intake policy` to list the configured categories."
            )
        }
        UploadError::InvalidConfig(reason) => {
            anyhow!(
                "Invalid policy [{code}]: {reason}\n\
                 HINT: Check the file passed with --policy."
            )
        }
        UploadError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                file.display(),
                io_err
            )
        }
    }
}

/// Adds upload context to a core result
pub fn add_upload_context<T>(
    result: Result<T, UploadError>,
    file: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_upload_error(e, file))
}
