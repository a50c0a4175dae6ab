//! Shared types and wire format for depot.
//!
//! Everything here is pure data: the content hash, the artifact descriptor,
//! version ordering and ranges, and the text codec for the index file. The
//! repository logic that owns these lives in `depot-core`.

pub mod descriptor;
pub mod hash;
pub mod index;
pub mod types;

// Re-exports
pub use descriptor::ResourceDescriptor;
pub use hash::{ContentHash, ContentHasher, HASH_LEN, HashError};
pub use index::{INDEX_VERSION, IndexError, IndexFile};
pub use types::{RangeError, Version, VersionRange};
