//! Content-addressed cache over the mirror's output directory.
//!
//! This module provides the filesystem half of the cache:
//!
//! - Fingerprints of final artifact bytes (SHA-256, fixed length)
//! - Logical names stable across upstream cache-busting
//! - A directory-listing based index locating prior artifacts
//! - Atomic writes so concurrent readers never see partial files

pub mod fingerprint;
pub mod index;
pub mod naming;
pub mod store;

pub use crate::Error;

pub use fingerprint::{FINGERPRINT_LEN, fingerprint};
pub use index::CacheIndex;
pub use naming::LogicalName;
pub use store::write_atomic;
