//! Validation and secure storage for untrusted file uploads.
//!
//! `intake-core` decides whether an uploaded file may be kept, and if so
//! where. Declared metadata is checked against a per-category policy before
//! anything is written; after the bytes are in place, their magic number,
//! leading content and (for ZIP containers) central directory are inspected,
//! and a rejected file is deleted before the error is returned. Stored files
//! are later read back only through a containment guard.
//!
//! # Examples
//!
//! ```no_run
//! use intake_core::PolicyConfig;
//! use intake_core::UploadValidator;
//! use intake_core::types::UploadedFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = UploadValidator::new(PolicyConfig::default())?;
//! let upload = UploadedFile::from_staged("syllabus.pdf", "application/pdf", "/tmp/upload-1")?;
//!
//! match validator.ingest(&upload, "documents", None) {
//!     Ok(stored) => println!("stored {}", stored.stored_filename),
//!     Err(err) => println!("rejected: {} ({})", err, err.reason_code()),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod security;
pub mod storage;
#[doc(hidden)]
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use config::PolicyConfig;
pub use error::Result;
pub use error::UploadError;
pub use pipeline::UploadValidator;
pub use security::sanitize_filename;
pub use security::validate_declared_metadata;

// Re-export types module for easier access
pub use types::StoredFile;
pub use types::UploadCategory;
pub use types::UploadedFile;
pub use types::ValidationOutcome;
