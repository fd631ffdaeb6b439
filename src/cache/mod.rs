//! Generic key-value blob storage for offline support.
//!
//! This module knows nothing about users:
//! - Values are opaque byte blobs stored under string keys
//! - Every write replaces the previous value for that key
//! - Each blob remembers when it was written

pub(crate) mod storage;

pub use storage::{BlobStore, NoopStorage, SqliteStorage};
