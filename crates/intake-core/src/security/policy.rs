//! Declared-metadata policy checks.

use crate::PolicyConfig;
use crate::Result;
use crate::UploadError;
use crate::security::filename::file_extension;
use crate::security::filename::sanitize_filename;
use crate::types::UploadCategory;
use crate::types::UploadedFile;

/// Validates an upload's declared metadata against its category.
///
/// Checks run in order and stop at the first failure:
/// 1. size within `category.max_size_bytes`, else `SizeExceeded`
/// 2. extension not on the global deny-list, else `ExtensionDenied`; the
///    deny-list wins even when the category allows the extension
/// 3. extension in the category allow-list, else `ExtensionDenied`
/// 4. declared MIME type in the category allow-list, else `MimeMismatch`.
///    An archive extension declared as the generic binary stream type is
///    accepted tentatively; signature inspection confirms it after writing.
///
/// The extension is read from the sanitized filename, so control bytes or
/// encoded separators cannot hide it. This function never touches the
/// filesystem.
///
/// # Errors
///
/// Returns `SizeExceeded`, `ExtensionDenied` or `MimeMismatch`.
///
/// # Examples
///
/// ```
/// use intake_core::PolicyConfig;
/// use intake_core::UploadError;
/// use intake_core::security::validate_declared_metadata;
/// use intake_core::types::UploadedFile;
///
/// let config = PolicyConfig::default();
/// let images = config.category("images").unwrap();
///
/// let ok = UploadedFile::new("cat.png", "image/png", 1024, "/tmp/staged");
/// assert!(validate_declared_metadata(&ok, images, &config).is_ok());
///
/// let bad = UploadedFile::new("cat.exe", "image/png", 1024, "/tmp/staged");
/// assert!(matches!(
///     validate_declared_metadata(&bad, images, &config),
///     Err(UploadError::ExtensionDenied { .. })
/// ));
/// ```
pub fn validate_declared_metadata(
    file: &UploadedFile,
    category: &UploadCategory,
    config: &PolicyConfig,
) -> Result<()> {
    if file.size_bytes > category.max_size_bytes {
        return Err(UploadError::SizeExceeded {
            size: file.size_bytes,
            max: category.max_size_bytes,
        });
    }

    let extension = file_extension(&sanitize_filename(&file.original_name));

    if config.is_extension_denied(&extension) || !category.allows_extension(&extension) {
        return Err(UploadError::ExtensionDenied { extension });
    }

    if category.allows_mime_type(&file.declared_mime_type) {
        return Ok(());
    }

    if config.is_archive_extension(&extension) && config.is_generic_binary(&file.declared_mime_type)
    {
        tracing::debug!(
            category = %category.id,
            extension = %extension,
            "archive declared as generic binary stream, deferring to signature check"
        );
        return Ok(());
    }

    Err(UploadError::MimeMismatch {
        declared: file.declared_mime_type.clone(),
        category: category.id.clone(),
    })
}
