//! Value types crossing the pipeline boundary.
//!
//! The transport layer maps its native upload object into an [`UploadedFile`]
//! immediately; nothing else from the transport is passed through. Successful
//! ingests produce a [`StoredFile`], and every decision can be summarized as a
//! [`ValidationOutcome`].

pub mod category;
pub mod outcome;
pub mod upload;

pub use category::UploadCategory;
pub use outcome::ValidationOutcome;
pub use outcome::ValidationStage;
pub use upload::StorageSlot;
pub use upload::StoredFile;
pub use upload::UploadedFile;
