//! ZIP container inspection.
//!
//! Reads only the central directory; entry data is never decompressed.

use std::io::Read;
use std::io::Seek;

use crate::PolicyConfig;
use crate::Result;
use crate::UploadError;

use super::detect::office_kind_for_entry;

/// Central-directory name of the VBA project part in macro-enabled OOXML.
const VBA_PROJECT_ENTRY: &str = "vbaproject.bin";

/// Part every OOXML package carries at its root.
const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";

/// What the central directory of a ZIP container says about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of entries.
    pub entries: usize,
    /// Sum of the entries' compressed sizes.
    pub compressed_size: u64,
    /// Sum of the entries' declared uncompressed sizes.
    pub uncompressed_size: u64,
    /// OOXML type implied by the first `word/`, `xl/` or `ppt/` entry.
    ///
    /// Only set when the archive also holds `[Content_Types].xml`; a plain
    /// archive with a `word/` folder stays a plain archive.
    pub office_kind: Option<&'static str>,
    /// First entry that looks like a VBA project.
    pub macro_entry: Option<String>,
}

impl ArchiveSummary {
    /// Uncompressed to compressed ratio, or `None` for an empty archive.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compression_ratio(&self) -> Option<f64> {
        (self.compressed_size > 0)
            .then(|| self.uncompressed_size as f64 / self.compressed_size as f64)
    }
}

/// Reads a ZIP central directory into an [`ArchiveSummary`].
///
/// # Errors
///
/// Returns `UploadError::InvalidArchive` if the container cannot be parsed.
pub fn inspect_zip<R: Read + Seek>(reader: R) -> Result<ArchiveSummary> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| UploadError::InvalidArchive(format!("failed to open ZIP archive: {e}")))?;

    let mut summary = ArchiveSummary {
        entries: archive.len(),
        ..ArchiveSummary::default()
    };

    let mut flavor = None;
    let mut has_content_types = false;

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| {
            UploadError::InvalidArchive(format!("failed to read ZIP entry: {e}"))
        })?;

        summary.compressed_size = summary.compressed_size.saturating_add(entry.compressed_size());
        summary.uncompressed_size = summary.uncompressed_size.saturating_add(entry.size());

        let name = entry.name();
        if flavor.is_none() {
            flavor = office_kind_for_entry(name);
        }
        has_content_types |= name == CONTENT_TYPES_ENTRY;
        if summary.macro_entry.is_none() && is_vba_project(name) {
            summary.macro_entry = Some(name.to_string());
        }
    }

    summary.office_kind = flavor.filter(|_| has_content_types);
    Ok(summary)
}

/// Checks an archive summary against the policy's archive limits.
///
/// # Errors
///
/// Returns `ArchiveTooLarge` if the summed uncompressed size exceeds
/// `archive_max_uncompressed_size`, or `ZipBomb` if the compression ratio
/// exceeds `max_compression_ratio`.
pub fn validate_archive_limits(summary: &ArchiveSummary, config: &PolicyConfig) -> Result<()> {
    if summary.uncompressed_size > config.archive_max_uncompressed_size {
        return Err(UploadError::ArchiveTooLarge {
            size: summary.uncompressed_size,
            max: config.archive_max_uncompressed_size,
        });
    }

    if let Some(ratio) = summary.compression_ratio()
        && ratio > config.max_compression_ratio
    {
        return Err(UploadError::ZipBomb {
            compressed: summary.compressed_size,
            uncompressed: summary.uncompressed_size,
            ratio,
        });
    }

    Ok(())
}

fn is_vba_project(name: &str) -> bool {
    name.rsplit('/')
        .next()
        .is_some_and(|file| file.eq_ignore_ascii_case(VBA_PROJECT_ENTRY))
}
