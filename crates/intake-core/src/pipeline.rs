//! Upload validation pipeline.
//!
//! [`UploadValidator`] owns the policy, the signature registry, the compiled
//! content scanner and the storage allocator. It sequences the pre-write
//! policy checks and the post-write byte checks, and guarantees that a
//! rejected file does not stay on disk.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::PolicyConfig;
use crate::Result;
use crate::UploadError;
use crate::formats::ArchiveSummary;
use crate::formats::Detection;
use crate::formats::SignatureKind;
use crate::formats::SignatureRegistry;
use crate::formats::detect::OFFICE_SNIFF_WINDOW;
use crate::formats::detect::is_zip_prefix;
use crate::formats::detect_file_type;
use crate::formats::inspect_zip;
use crate::formats::matches_signature;
use crate::formats::mime;
use crate::formats::refine_zip_detection;
use crate::formats::validate_archive_limits;
use crate::security::ContentScanner;
use crate::security::Requester;
use crate::security::ServedFile;
use crate::security::filename::file_extension;
use crate::security::resolve_for_serving;
use crate::security::sanitize_filename;
use crate::storage::StorageAllocator;
use crate::types::StoredFile;
use crate::types::UploadCategory;
use crate::types::UploadedFile;
use crate::types::ValidationStage;

/// Validates, stores and serves untrusted uploads.
///
/// Construct once at startup and share; every method takes `&self`.
///
/// # Examples
///
/// ```no_run
/// use intake_core::PolicyConfig;
/// use intake_core::UploadValidator;
/// use intake_core::types::UploadedFile;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let validator = UploadValidator::new(PolicyConfig::default())?;
///
/// let upload = UploadedFile::from_staged("doc1.pdf", "application/pdf", "/tmp/staged-1")?;
/// let stored = validator.ingest(&upload, "materials", Some("42"))?;
/// println!("stored at {}", stored.stored_path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UploadValidator {
    config: PolicyConfig,
    registry: SignatureRegistry,
    scanner: ContentScanner,
    allocator: StorageAllocator,
}

impl UploadValidator {
    /// Creates a validator with the default signature registry.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidConfig` if the policy is inconsistent or
    /// an extra scan pattern does not compile.
    pub fn new(config: PolicyConfig) -> Result<Self> {
        Self::with_registry(config, SignatureRegistry::default())
    }

    /// Creates a validator with a custom signature registry.
    ///
    /// # Errors
    ///
    /// Same as [`UploadValidator::new`].
    pub fn with_registry(config: PolicyConfig, registry: SignatureRegistry) -> Result<Self> {
        config.validate()?;
        let scanner = ContentScanner::new(&config)?;
        let allocator = StorageAllocator::new(config.storage_root.clone());
        Ok(Self {
            config,
            registry,
            scanner,
            allocator,
        })
    }

    /// The active policy.
    #[must_use]
    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// The signature registry.
    #[must_use]
    pub const fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    /// The compiled content scanner.
    #[must_use]
    pub const fn scanner(&self) -> &ContentScanner {
        &self.scanner
    }

    /// The storage allocator.
    #[must_use]
    pub const fn allocator(&self) -> &StorageAllocator {
        &self.allocator
    }

    /// Checks declared metadata against a category looked up by id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategory` or any error of
    /// [`crate::security::validate_declared_metadata`].
    pub fn validate_declared_metadata(&self, file: &UploadedFile, category_id: &str) -> Result<()> {
        let category = self.config.require_category(category_id)?;
        crate::security::validate_declared_metadata(file, category, &self.config)
    }

    /// Runs every byte-level check on a file already on disk, without
    /// modifying or deleting it.
    ///
    /// In order: signature against the declared type, content scan of the
    /// first `scan_limit` bytes, archive limits, detected-versus-declared
    /// type cross-check.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the path does not exist, otherwise the first
    /// failing check's error.
    pub fn check_stored_file(
        &self,
        path: &Path,
        declared_mime_type: &str,
        original_name: &str,
    ) -> Result<()> {
        let mut file = open_stored(path)?;
        let size = file.metadata()?.len();
        let head = read_head(
            &mut file,
            self.config.scan_limit.max(OFFICE_SNIFF_WINDOW),
        )?;

        self.check_signature(&head, declared_mime_type, original_name)?;

        let scan_window = &head[..head.len().min(self.config.scan_limit)];
        self.scanner.scan(scan_window, declared_mime_type)?;

        let archive =
            self.check_archive(&mut file, &head, size, declared_mime_type, original_name)?;

        self.cross_check(&head, declared_mime_type, original_name, archive.as_ref())
    }

    /// Identifies a file on disk the way the post-write cross-check does.
    ///
    /// A ZIP container is refined to its OOXML type from the central
    /// directory. A container whose central directory cannot be read is
    /// reported as a plain ZIP; [`UploadValidator::check_stored_file`]
    /// reports the damage.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the path does not exist, or `Io` if it
    /// cannot be read.
    pub fn detect(&self, path: &Path) -> Result<Detection> {
        let mut file = open_stored(path)?;
        let head = read_head(&mut file, OFFICE_SNIFF_WINDOW)?;
        let detection = detect_file_type(&self.registry, &head);

        let archive = if detection == Detection::Known(mime::ZIP) {
            file.seek(SeekFrom::Start(0))?;
            inspect_zip(BufReader::new(file)).ok()
        } else {
            None
        };

        Ok(refine_zip_detection(detection, &head, archive.as_ref()))
    }

    /// Runs [`UploadValidator::check_stored_file`] and deletes the file if
    /// any check fails.
    ///
    /// Deletion is best-effort: a failure to delete is logged and the
    /// original validation error is still returned.
    ///
    /// # Errors
    ///
    /// Returns the first failing check's error.
    pub fn post_write_validate(
        &self,
        path: &Path,
        declared_mime_type: &str,
        original_name: &str,
    ) -> Result<()> {
        self.check_stored_file(path, declared_mime_type, original_name)
            .inspect_err(|err| discard(path, err))
    }

    /// Runs the whole pipeline for one staged upload.
    ///
    /// Category lookup, declared-metadata policy, slot allocation, moving the
    /// staged bytes to their final path, then post-write validation. A
    /// pre-write rejection leaves the staged file untouched for the transport
    /// to clean up; a post-write rejection deletes the moved file.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategory`, any policy or content error, or an I/O
    /// error if the file cannot be moved into place.
    pub fn ingest(
        &self,
        file: &UploadedFile,
        category_id: &str,
        user_id: Option<&str>,
    ) -> Result<StoredFile> {
        tracing::debug!(
            stage = %ValidationStage::Staged,
            original_name = %file.original_name,
            declared_mime_type = %file.declared_mime_type,
            size_bytes = file.size_bytes,
            category = category_id,
            "validating upload"
        );

        let category = self
            .config
            .require_category(category_id)
            .inspect_err(|err| log_rejection(ValidationStage::RejectedPre, file, err))?;

        crate::security::validate_declared_metadata(file, category, &self.config)
            .inspect_err(|err| log_rejection(ValidationStage::RejectedPre, file, err))?;

        let slot = self
            .allocator
            .allocate(&category.id, user_id, &file.original_name)?;
        let target = slot.path();
        move_into_place(&file.staged_path, &target)?;

        tracing::debug!(
            stage = %ValidationStage::Written,
            path = %target.display(),
            "upload moved into place"
        );

        check_written_size(&target, category)
            .and_then(|()| {
                self.check_stored_file(&target, &file.declared_mime_type, &file.original_name)
            })
            .inspect_err(|err| {
                discard(&target, err);
                log_rejection(ValidationStage::RejectedPost, file, err);
            })?;

        tracing::info!(
            stage = %ValidationStage::Accepted,
            category = %category.id,
            stored_filename = %slot.stored_filename,
            "upload accepted"
        );

        Ok(StoredFile {
            category: category.id.clone(),
            stored_path: target,
            stored_filename: slot.stored_filename,
        })
    }

    /// Runs [`UploadValidator::ingest`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`UploadValidator::ingest`], plus an I/O error if the
    /// blocking task panics or is cancelled.
    pub async fn ingest_async(
        self: Arc<Self>,
        file: UploadedFile,
        category_id: String,
        user_id: Option<String>,
    ) -> Result<StoredFile> {
        tokio::task::spawn_blocking(move || self.ingest(&file, &category_id, user_id.as_deref()))
            .await
            .map_err(|e| {
                UploadError::Io(std::io::Error::other(format!(
                    "validation task failed: {e}"
                )))
            })?
    }

    /// Runs [`UploadValidator::post_write_validate`] on the blocking thread
    /// pool.
    ///
    /// # Errors
    ///
    /// Same as [`UploadValidator::post_write_validate`], plus an I/O error if
    /// the blocking task panics or is cancelled.
    pub async fn post_write_validate_async(
        self: Arc<Self>,
        path: PathBuf,
        declared_mime_type: String,
        original_name: String,
    ) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            self.post_write_validate(&path, &declared_mime_type, &original_name)
        })
        .await
        .map_err(|e| {
            UploadError::Io(std::io::Error::other(format!(
                "validation task failed: {e}"
            )))
        })?
    }

    /// Resolves a stored file for serving, contained in the storage root.
    ///
    /// # Errors
    ///
    /// See [`crate::security::resolve_for_serving`].
    pub fn resolve_for_serving(&self, requested: &Path, requester: &Requester) -> Result<ServedFile> {
        resolve_for_serving(requested, &self.config.storage_root, requester)
    }

    /// Malicious prefixes first, then the declared type's own signatures.
    ///
    /// An archive upload must carry a ZIP signature even when it was
    /// declared as a generic binary stream.
    fn check_signature(&self, head: &[u8], declared: &str, original_name: &str) -> Result<()> {
        if let Some(sig) = self
            .registry
            .malicious()
            .iter()
            .find(|sig| matches_signature(head, sig.bytes))
        {
            return Err(UploadError::SignatureMismatch {
                declared: declared.to_string(),
                detail: format!("file starts with a {} signature", sig.format),
            });
        }

        if self.is_archive_upload(declared, original_name) && !is_zip_prefix(head) {
            return Err(UploadError::SignatureMismatch {
                declared: declared.to_string(),
                detail: "archive upload does not start with a ZIP signature".to_string(),
            });
        }

        let Some(entry) = self.registry.entry(declared) else {
            return Ok(());
        };
        if !entry.has_signature() || entry.signatures.iter().any(|sig| matches_signature(head, sig)) {
            return Ok(());
        }

        Err(UploadError::SignatureMismatch {
            declared: declared.to_string(),
            detail: "file does not start with any signature of the declared type".to_string(),
        })
    }

    /// Archive size ceiling, then central-directory limits for ZIP
    /// containers.
    fn check_archive(
        &self,
        file: &mut File,
        head: &[u8],
        size: u64,
        declared: &str,
        original_name: &str,
    ) -> Result<Option<ArchiveSummary>> {
        if self.is_archive_upload(declared, original_name) && size > self.config.archive_max_size {
            return Err(UploadError::ArchiveTooLarge {
                size,
                max: self.config.archive_max_size,
            });
        }

        if !is_zip_prefix(head) {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(0))?;
        let summary = inspect_zip(BufReader::new(file))?;
        validate_archive_limits(&summary, &self.config)?;

        if mime::is_ooxml(declared)
            && let Some(entry) = &summary.macro_entry
        {
            return Err(UploadError::MacroContent {
                marker: entry.clone(),
            });
        }

        Ok(Some(summary))
    }

    fn is_archive_upload(&self, declared: &str, original_name: &str) -> bool {
        self.config.is_archive_mime(declared)
            || (self.config.is_generic_binary(declared) && self.has_archive_extension(original_name))
    }

    fn has_archive_extension(&self, original_name: &str) -> bool {
        self.config
            .is_archive_extension(&file_extension(&sanitize_filename(original_name)))
    }

    /// Compares the sniffed type with the declared type.
    fn cross_check(
        &self,
        head: &[u8],
        declared: &str,
        original_name: &str,
        archive: Option<&ArchiveSummary>,
    ) -> Result<()> {
        let detection = refine_zip_detection(detect_file_type(&self.registry, head), head, archive);
        let detected = match detection {
            Detection::Malicious { format } => {
                return Err(UploadError::SignatureMismatch {
                    declared: declared.to_string(),
                    detail: format!("file starts with a {format} signature"),
                });
            }
            Detection::Known(detected) => Some(detected),
            Detection::Unknown => None,
        };

        let consistent = match detected {
            Some(detected) => {
                self.config.are_equivalent(detected, declared)
                    || (self.config.is_archive_mime(detected)
                        && self.config.is_generic_binary(declared)
                        && self.has_archive_extension(original_name))
                    || self.declared_signature_matches(head, declared)
            }
            // Only a registered signature-less type (plain text) may match nothing.
            None => self
                .registry
                .entry(declared)
                .is_some_and(|entry| !entry.has_signature()),
        };

        if consistent {
            Ok(())
        } else {
            Err(UploadError::TypeMismatch {
                declared: declared.to_string(),
                detected: detected.map(str::to_string),
            })
        }
    }

    /// Formats that share a magic number (OLE2 `.doc`/`.xls`/`.ppt`) cannot
    /// be told apart by prefix; a `Simple` declared type whose own signature
    /// matched is consistent.
    fn declared_signature_matches(&self, head: &[u8], declared: &str) -> bool {
        self.registry.entry(declared).is_some_and(|entry| {
            entry.kind == SignatureKind::Simple
                && entry
                    .signatures
                    .iter()
                    .any(|sig| matches_signature(head, sig))
        })
    }
}

fn open_stored(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            UploadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            UploadError::Io(e)
        }
    })
}

/// Reads at most `limit` leading bytes.
fn read_head(file: &mut File, limit: usize) -> Result<Vec<u8>> {
    let mut head = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut head)?;
    Ok(head)
}

/// The transport-reported size is advisory; the bytes on disk decide.
fn check_written_size(path: &Path, category: &UploadCategory) -> Result<()> {
    let size = std::fs::metadata(path)?.len();
    if size > category.max_size_bytes {
        return Err(UploadError::SizeExceeded {
            size,
            max: category.max_size_bytes,
        });
    }
    Ok(())
}

/// Moves a staged file to `target`, never replacing an existing file.
fn move_into_place(staged: &Path, target: &Path) -> Result<()> {
    if target.symlink_metadata().is_ok() {
        return Err(UploadError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("refusing to overwrite {}", target.display()),
        )));
    }

    match std::fs::rename(staged, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            let mut source = File::open(staged)?;
            let mut destination = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(target)?;
            if let Err(e) = std::io::copy(&mut source, &mut destination) {
                drop(destination);
                let _ = std::fs::remove_file(target);
                return Err(e.into());
            }
            if let Err(e) = std::fs::remove_file(staged) {
                tracing::warn!(
                    path = %staged.display(),
                    error = %e,
                    "failed to remove staged file after copy"
                );
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes a rejected file. Failure is logged, never raised.
fn discard(path: &Path, err: &UploadError) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "rejected file deleted"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::error!(
            path = %path.display(),
            reason = err.reason_code(),
            error = %e,
            "failed to delete rejected file"
        ),
    }
}

fn log_rejection(stage: ValidationStage, file: &UploadedFile, err: &UploadError) {
    tracing::warn!(
        stage = %stage,
        original_name = %file.original_name,
        declared_mime_type = %file.declared_mime_type,
        reason = err.reason_code(),
        error = %err,
        "upload rejected"
    );
}
