//! Magic-number registry for accepted and known-malicious formats.

use super::mime;

/// ZIP local file header, end of central directory and spanning marker.
pub const ZIP_SIGNATURES: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

const PDF_SIGNATURES: &[&[u8]] = &[b"%PDF"];
const JPEG_SIGNATURES: &[&[u8]] = &[&[0xFF, 0xD8, 0xFF]];
const PNG_SIGNATURES: &[&[u8]] = &[&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]];
const GIF_SIGNATURES: &[&[u8]] = &[b"GIF87a", b"GIF89a"];
const WEBP_SIGNATURES: &[&[u8]] = &[b"RIFF"];
const OLE2_SIGNATURES: &[&[u8]] = &[&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]];
const NO_SIGNATURE: &[&[u8]] = &[];

/// How a registry entry takes part in content-type detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// The prefix alone identifies the format.
    Simple,
    /// The prefix is the shared ZIP header; the container contents decide
    /// between a plain archive and an Office document.
    ZipContainer,
}

/// Accepted format and the byte prefixes that identify it.
///
/// An empty `signatures` list means the format has no fixed signature (plain
/// text, CSV) and is accepted on metadata alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEntry {
    /// MIME type of the format.
    pub mime_type: &'static str,
    /// Accepted leading byte sequences.
    pub signatures: &'static [&'static [u8]],
    /// Detection strategy.
    pub kind: SignatureKind,
}

impl SignatureEntry {
    const fn simple(mime_type: &'static str, signatures: &'static [&'static [u8]]) -> Self {
        Self {
            mime_type,
            signatures,
            kind: SignatureKind::Simple,
        }
    }

    const fn zip_container(mime_type: &'static str) -> Self {
        Self {
            mime_type,
            signatures: &ZIP_SIGNATURES,
            kind: SignatureKind::ZipContainer,
        }
    }

    /// Returns `true` if the format has at least one fixed signature.
    #[must_use]
    pub const fn has_signature(&self) -> bool {
        !self.signatures.is_empty()
    }
}

/// A byte prefix that is rejected whatever the declared or category type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaliciousSignature {
    /// Human-readable format name.
    pub format: &'static str,
    /// MIME type usually associated with the format.
    pub mime_type: &'static str,
    /// Magic number.
    pub bytes: &'static [u8],
}

/// Executable and bytecode magic numbers.
pub const EXECUTABLE_SIGNATURES: [MaliciousSignature; 7] = [
    MaliciousSignature {
        format: "Windows PE",
        mime_type: "application/x-msdownload",
        bytes: b"MZ",
    },
    MaliciousSignature {
        format: "ELF",
        mime_type: "application/x-executable",
        bytes: &[0x7F, 0x45, 0x4C, 0x46],
    },
    MaliciousSignature {
        format: "Mach-O 32-bit",
        mime_type: "application/x-mach-binary",
        bytes: &[0xFE, 0xED, 0xFA, 0xCE],
    },
    MaliciousSignature {
        format: "Mach-O 64-bit",
        mime_type: "application/x-mach-binary",
        bytes: &[0xFE, 0xED, 0xFA, 0xCF],
    },
    MaliciousSignature {
        format: "Mach-O 32-bit (reverse byte order)",
        mime_type: "application/x-mach-binary",
        bytes: &[0xCE, 0xFA, 0xED, 0xFE],
    },
    MaliciousSignature {
        format: "Mach-O 64-bit (reverse byte order)",
        mime_type: "application/x-mach-binary",
        bytes: &[0xCF, 0xFA, 0xED, 0xFE],
    },
    MaliciousSignature {
        format: "Java class",
        mime_type: "application/java-vm",
        bytes: &[0xCA, 0xFE, 0xBA, 0xBE],
    },
];

/// Immutable table of accepted and malicious signatures.
///
/// Built once at startup and shared by reference. Entry order matters for
/// detection: the first matching `Simple` entry wins, so canonical MIME names
/// come before their aliases.
///
/// # Examples
///
/// ```
/// use intake_core::formats::SignatureRegistry;
///
/// let registry = SignatureRegistry::default();
/// let pdf = registry.entry("application/pdf").unwrap();
/// assert!(pdf.has_signature());
/// assert!(!registry.entry("text/plain").unwrap().has_signature());
/// ```
#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    entries: Vec<SignatureEntry>,
    malicious: Vec<MaliciousSignature>,
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::new(
            vec![
                SignatureEntry::simple(mime::PDF, PDF_SIGNATURES),
                SignatureEntry::simple(mime::JPEG, JPEG_SIGNATURES),
                SignatureEntry::simple(mime::JPG, JPEG_SIGNATURES),
                SignatureEntry::simple(mime::PNG, PNG_SIGNATURES),
                SignatureEntry::simple(mime::GIF, GIF_SIGNATURES),
                SignatureEntry::simple(mime::WEBP, WEBP_SIGNATURES),
                SignatureEntry::simple(mime::DOC, OLE2_SIGNATURES),
                SignatureEntry::simple(mime::XLS, OLE2_SIGNATURES),
                SignatureEntry::simple(mime::PPT, OLE2_SIGNATURES),
                SignatureEntry::zip_container(mime::ZIP),
                SignatureEntry::zip_container(mime::ZIP_COMPRESSED),
                SignatureEntry::zip_container(mime::DOCX),
                SignatureEntry::zip_container(mime::XLSX),
                SignatureEntry::zip_container(mime::PPTX),
                SignatureEntry::simple(mime::TEXT, NO_SIGNATURE),
                SignatureEntry::simple(mime::CSV, NO_SIGNATURE),
            ],
            EXECUTABLE_SIGNATURES.to_vec(),
        )
    }
}

impl SignatureRegistry {
    /// Creates a registry from explicit tables.
    #[must_use]
    pub fn new(entries: Vec<SignatureEntry>, malicious: Vec<MaliciousSignature>) -> Self {
        Self { entries, malicious }
    }

    /// Accepted formats, in detection order.
    #[must_use]
    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    /// Unconditionally rejected prefixes.
    #[must_use]
    pub fn malicious(&self) -> &[MaliciousSignature] {
        &self.malicious
    }

    /// Looks up the entry for a MIME type (case-insensitive).
    #[must_use]
    pub fn entry(&self, mime_type: &str) -> Option<&SignatureEntry> {
        let mime_type = mime_type.trim();
        self.entries
            .iter()
            .find(|entry| entry.mime_type.eq_ignore_ascii_case(mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_policy_types() {
        let registry = SignatureRegistry::default();
        for mime_type in [
            mime::PDF,
            mime::JPEG,
            mime::PNG,
            mime::GIF,
            mime::WEBP,
            mime::ZIP,
            mime::DOCX,
            mime::XLSX,
            mime::PPTX,
            mime::DOC,
            mime::TEXT,
        ] {
            assert!(registry.entry(mime_type).is_some(), "{mime_type} missing");
        }
    }

    #[test]
    fn test_zip_family_uses_container_kind() {
        let registry = SignatureRegistry::default();
        for mime_type in [mime::ZIP, mime::ZIP_COMPRESSED, mime::DOCX, mime::XLSX, mime::PPTX] {
            let entry = registry.entry(mime_type).unwrap_or_else(|| panic!("{mime_type}"));
            assert_eq!(entry.kind, SignatureKind::ZipContainer);
            assert_eq!(entry.signatures.len(), 3);
        }
    }

    #[test]
    fn test_canonical_jpeg_before_alias() {
        let registry = SignatureRegistry::default();
        let position = |m: &str| registry.entries().iter().position(|e| e.mime_type == m);
        assert!(position(mime::JPEG) < position(mime::JPG));
    }

    #[test]
    fn test_entry_lookup_case_insensitive() {
        let registry = SignatureRegistry::default();
        assert!(registry.entry("Application/PDF").is_some());
        assert!(registry.entry("application/x-unknown").is_none());
    }

    #[test]
    fn test_malicious_table() {
        let registry = SignatureRegistry::default();
        assert_eq!(registry.malicious().len(), 7);
        assert!(registry.malicious().iter().any(|sig| sig.bytes == b"MZ"));
    }
}
