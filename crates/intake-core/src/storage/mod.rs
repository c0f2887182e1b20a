//! Storage directory layout and stored-file naming.

pub mod allocator;

pub use allocator::StorageAllocator;
pub use allocator::generate_stored_filename;
pub use allocator::is_safe_segment;
