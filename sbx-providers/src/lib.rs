//! Storage providers for Shardbox
//!
//! A `ChunkStorage` turns any remote file API into a chunk storage backend.
//! Remotes: Dropbox (feature `dropbox`, on by default) and an in-memory tree.

pub mod memory;
pub mod pool;
pub mod remote;
pub mod storage;

#[cfg(feature = "dropbox")]
pub mod dropbox;

pub use memory::{MemoryClient, RemoteCall};
pub use pool::ClientPool;
pub use remote::{ListFolderPage, RemoteClient, RemoteEntryKind, RemoteMetadata};
pub use storage::ChunkStorage;

#[cfg(feature = "dropbox")]
pub use dropbox::{open_dropbox_storage, DropboxClient, DropboxConfig, DropboxStorage};

/// Chunk storage kept entirely in process memory
pub type MemoryStorage = ChunkStorage<MemoryClient>;

/// Open an in-memory chunk storage whose clients all share one tree.
pub async fn open_memory_storage(
    remote: &MemoryClient,
    config: &sbx_core::StorageConfig,
) -> sbx_core::SbxResult<MemoryStorage> {
    config.validate()?;
    let clients = ClientPool::from_fn(config.threads, |_| remote.clone())?;
    ChunkStorage::create(clients, config).await
}
