//! Storage slot allocation.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;

use crate::Result;
use crate::UploadError;
use crate::security::filename::split_name;
use crate::security::sanitize_filename_at;
use crate::types::StorageSlot;

/// Mode applied to every directory the allocator creates.
#[cfg(unix)]
const OWNER_ONLY_MODE: u32 = 0o700;

/// Random bytes in each stored filename.
const RANDOM_BYTES: usize = 8;

/// Returns `true` if `segment` is usable as exactly one path component.
///
/// Rejects empty strings, `.`, `..`, path separators, NUL and other control
/// characters.
///
/// # Examples
///
/// ```
/// use intake_core::storage::is_safe_segment;
///
/// assert!(is_safe_segment("images"));
/// assert!(is_safe_segment("user-42"));
/// assert!(!is_safe_segment("../images"));
/// assert!(!is_safe_segment("a/b"));
/// assert!(!is_safe_segment(".."));
/// ```
#[must_use]
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Computes owner-only storage directories and collision-resistant names.
///
/// # Examples
///
/// ```no_run
/// use intake_core::storage::StorageAllocator;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let allocator = StorageAllocator::new("/srv/uploads");
/// let slot = allocator.allocate("materials", Some("42"), "Lecture 1.pdf")?;
/// assert!(slot.stored_filename.starts_with("materials_"));
/// assert!(slot.stored_filename.ends_with("_Lecture_1.pdf"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StorageAllocator {
    root: PathBuf,
}

impl StorageAllocator {
    /// Creates an allocator rooted at `root`. Nothing is created until
    /// [`StorageAllocator::allocate`] is called.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `root/category[/user_id]` without creating it.
    ///
    /// # Errors
    ///
    /// Returns `ContainmentViolation` if the category or user id is not a
    /// single safe path segment.
    pub fn directory_for(&self, category: &str, user_id: Option<&str>) -> Result<PathBuf> {
        let mut directory = self.root.clone();
        for segment in std::iter::once(category).chain(user_id) {
            if !is_safe_segment(segment) {
                return Err(UploadError::ContainmentViolation {
                    path: directory.join(segment),
                });
            }
            directory.push(segment);
        }
        Ok(directory)
    }

    /// Creates the target directory and picks a unique stored filename.
    ///
    /// Directory creation tolerates concurrent creators. Owner-only
    /// permissions are applied on Unix; failing to apply them is logged and
    /// does not fail the allocation.
    ///
    /// # Errors
    ///
    /// Returns `ContainmentViolation` for unsafe segments or an I/O error if
    /// the directory cannot be created.
    pub fn allocate(
        &self,
        category: &str,
        user_id: Option<&str>,
        original_name: &str,
    ) -> Result<StorageSlot> {
        let directory = self.directory_for(category, user_id)?;

        match std::fs::create_dir_all(&directory) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists && directory.is_dir() => {}
            Err(e) => return Err(e.into()),
        }
        self.restrict_permissions(&directory);

        let stored_filename = generate_stored_filename(category, original_name, Utc::now());

        tracing::debug!(
            directory = %directory.display(),
            stored_filename = %stored_filename,
            "allocated storage slot"
        );

        Ok(StorageSlot {
            directory,
            stored_filename,
        })
    }

    /// Applies owner-only mode to every directory between the root and
    /// `directory`. The root itself is left alone.
    #[cfg(unix)]
    fn restrict_permissions(&self, directory: &Path) {
        use std::os::unix::fs::PermissionsExt;

        for dir in directory
            .ancestors()
            .take_while(|dir| dir.starts_with(&self.root) && *dir != self.root)
        {
            let permissions = std::fs::Permissions::from_mode(OWNER_ONLY_MODE);
            if let Err(e) = std::fs::set_permissions(dir, permissions) {
                tracing::warn!(
                    directory = %dir.display(),
                    error = %e,
                    "failed to restrict directory permissions"
                );
            }
        }
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_self)]
    fn restrict_permissions(&self, _directory: &Path) {}
}

/// Builds `{category}_{unixMillis}_{randomHex}_{sanitizedStem}{ext}`.
///
/// The random part is 8 bytes from the thread-local CSPRNG, hex-encoded.
#[must_use]
pub fn generate_stored_filename(category: &str, original_name: &str, now: DateTime<Utc>) -> String {
    let sanitized = sanitize_filename_at(original_name, now);
    let (stem, extension) = split_name(&sanitized);
    let random = hex::encode(rand::random::<[u8; RANDOM_BYTES]>());
    format!(
        "{category}_{}_{random}_{stem}{extension}",
        now.timestamp_millis()
    )
}
