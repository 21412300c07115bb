//! Shardbox Core
//!
//! Traits, types and the chunk locator shared by every chunk storage backend.

pub mod backend;
pub mod chunk;
pub mod config;
pub mod entry;
pub mod error;
pub mod locator;
pub mod metadata;
pub mod path;
pub mod rate;
pub mod walk;

#[cfg(test)]
mod testing;

pub use backend::{ByteStream, DirectoryOps, StorageBackend, StorageCapabilities};
pub use chunk::{ChunkId, CHUNKS_DIR, FOSSIL_SUFFIX};
pub use config::StorageConfig;
pub use entry::{ChunkListing, ChunkLocation, ListEntry};
pub use error::{SbxError, SbxResult};
pub use locator::ChunkLocator;
pub use metadata::FileInfo;
pub use path::{normalize, StoragePath};
pub use rate::RateLimit;
pub use walk::list_chunks;
