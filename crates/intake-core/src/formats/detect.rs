//! Content-type detection from leading bytes.

use super::ArchiveSummary;
use super::mime;
use super::signatures::SignatureKind;
use super::signatures::SignatureRegistry;
use super::signatures::ZIP_SIGNATURES;

/// How many leading bytes of a ZIP container are searched for Office
/// directory markers.
pub const OFFICE_SNIFF_WINDOW: usize = 100;

/// Directory markers that identify the OOXML flavor of a ZIP container.
const OFFICE_MARKERS: [(&[u8], &str); 3] = [
    (b"word/", mime::DOCX),
    (b"xl/", mime::XLSX),
    (b"ppt/", mime::PPTX),
];

/// Parts every OOXML package carries whatever its flavor.
const PACKAGE_MARKERS: [&[u8]; 3] = [b"[Content_Types].xml", b"_rels/", b"docProps/"];

/// Result of sniffing a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// A malicious signature matched at offset zero.
    Malicious {
        /// Executable format name.
        format: &'static str,
    },
    /// A registered format matched.
    Known(&'static str),
    /// No signature matched.
    Unknown,
}

impl Detection {
    /// Returns the detected MIME type for a known format.
    #[must_use]
    pub const fn mime_type(&self) -> Option<&'static str> {
        match self {
            Self::Known(mime_type) => Some(*mime_type),
            Self::Malicious { .. } | Self::Unknown => None,
        }
    }
}

/// Returns `true` if `bytes` starts with `signature`.
///
/// A buffer shorter than the signature never matches.
#[inline]
#[must_use]
pub fn matches_signature(bytes: &[u8], signature: &[u8]) -> bool {
    bytes.starts_with(signature)
}

/// Returns `true` if `bytes` starts with any ZIP signature.
#[must_use]
pub fn is_zip_prefix(bytes: &[u8]) -> bool {
    ZIP_SIGNATURES.iter().any(|sig| matches_signature(bytes, sig))
}

/// Identifies a buffer by its leading bytes.
///
/// Malicious signatures are checked first and short-circuit. A ZIP prefix is
/// refined to an OOXML type when `word/`, `xl/` or `ppt/` appears within the
/// first [`OFFICE_SNIFF_WINDOW`] bytes, otherwise it is reported as a plain
/// ZIP. Remaining formats are tried in registry order.
///
/// # Examples
///
/// ```
/// use intake_core::formats::Detection;
/// use intake_core::formats::SignatureRegistry;
/// use intake_core::formats::detect_file_type;
///
/// let registry = SignatureRegistry::default();
/// assert_eq!(
///     detect_file_type(&registry, b"%PDF-1.7"),
///     Detection::Known("application/pdf")
/// );
/// assert!(matches!(
///     detect_file_type(&registry, b"MZ\x90\x00"),
///     Detection::Malicious { .. }
/// ));
/// assert_eq!(detect_file_type(&registry, b"hello"), Detection::Unknown);
/// ```
#[must_use]
pub fn detect_file_type(registry: &SignatureRegistry, bytes: &[u8]) -> Detection {
    if let Some(sig) = registry
        .malicious()
        .iter()
        .find(|sig| matches_signature(bytes, sig.bytes))
    {
        return Detection::Malicious { format: sig.format };
    }

    if is_zip_prefix(bytes) {
        return Detection::Known(sniff_office_marker(bytes).unwrap_or(mime::ZIP));
    }

    registry
        .entries()
        .iter()
        .filter(|entry| entry.kind == SignatureKind::Simple)
        .find(|entry| {
            entry
                .signatures
                .iter()
                .any(|sig| matches_signature(bytes, sig))
        })
        .map_or(Detection::Unknown, |entry| Detection::Known(entry.mime_type))
}

/// Looks for an OOXML directory marker near the start of a ZIP container.
#[must_use]
pub fn sniff_office_marker(bytes: &[u8]) -> Option<&'static str> {
    let window = &bytes[..bytes.len().min(OFFICE_SNIFF_WINDOW)];
    OFFICE_MARKERS
        .iter()
        .find(|(marker, _)| contains(window, marker))
        .map(|(_, mime_type)| *mime_type)
}

/// Returns `true` if a generic OOXML package part (`[Content_Types].xml`,
/// `_rels/` or `docProps/`) appears within the first
/// [`OFFICE_SNIFF_WINDOW`] bytes.
///
/// These parts mark an Office package without naming its flavor.
#[must_use]
pub fn sniff_package_marker(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(OFFICE_SNIFF_WINDOW)];
    PACKAGE_MARKERS.iter().any(|marker| contains(window, marker))
}

/// Settles the flavor of a ZIP container the leading bytes left open.
///
/// A plain-ZIP detection becomes the archive's OOXML type when the leading
/// bytes carry a generic package marker and the central directory names a
/// flavor. Every other detection is returned unchanged.
#[must_use]
pub fn refine_zip_detection(
    detection: Detection,
    head: &[u8],
    archive: Option<&ArchiveSummary>,
) -> Detection {
    match (detection, archive) {
        (Detection::Known(mime::ZIP), Some(summary)) if sniff_package_marker(head) => summary
            .office_kind
            .map_or(detection, Detection::Known),
        _ => detection,
    }
}

/// Maps a ZIP entry path to the OOXML type its top-level directory implies.
#[must_use]
pub fn office_kind_for_entry(name: &str) -> Option<&'static str> {
    OFFICE_MARKERS
        .iter()
        .find(|(marker, _)| name.as_bytes().starts_with(marker))
        .map(|(_, mime_type)| *mime_type)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
