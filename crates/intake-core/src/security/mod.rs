//! Security checks: filename sanitization, declared-metadata policy, content
//! scanning and the read-back guard.

pub mod content;
pub mod filename;
pub mod policy;
pub mod serving;

pub use content::ContentScanner;
pub use filename::sanitize_filename;
pub use filename::sanitize_filename_at;
pub use policy::validate_declared_metadata;
pub use serving::Requester;
pub use serving::ServedFile;
pub use serving::resolve_for_serving;
