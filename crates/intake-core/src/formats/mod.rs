//! File format knowledge: MIME names, magic numbers, sniffing and ZIP
//! container inspection.

pub mod archive;
pub mod detect;
pub mod mime;
pub mod signatures;

pub use archive::ArchiveSummary;
pub use archive::inspect_zip;
pub use archive::validate_archive_limits;
pub use detect::Detection;
pub use detect::detect_file_type;
pub use detect::matches_signature;
pub use detect::refine_zip_detection;
pub use signatures::MaliciousSignature;
pub use signatures::SignatureEntry;
pub use signatures::SignatureKind;
pub use signatures::SignatureRegistry;
