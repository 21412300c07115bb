//! Storage backend traits

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::{
    entry::{ChunkLocation, ListEntry},
    error::SbxResult,
    metadata::FileInfo,
    ChunkId,
};

/// Byte stream type
pub type ByteStream = Pin<Box<dyn Stream<Item = SbxResult<Bytes>> + Send>>;

/// Behavioral properties a backend declares to the backup engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCapabilities {
    /// Keep a local snapshot cache to avoid repeated remote round trips
    pub needs_local_cache: bool,
    /// `move_file` may replace delete + re-upload during garbage collection
    pub supports_move: bool,
    /// A just-written file is immediately visible to list and stat
    pub strongly_consistent: bool,
    /// Bulk listing is cheap enough to prefer over targeted stat calls
    pub fast_listing: bool,
}

impl StorageCapabilities {
    pub fn dropbox() -> Self {
        Self {
            needs_local_cache: true,
            supports_move: true,
            strongly_consistent: false,
            fast_listing: false,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            needs_local_cache: false,
            supports_move: true,
            strongly_consistent: true,
            fast_listing: true,
        }
    }
}

/// Directory primitives. Every call names the worker thread issuing it so the
/// backend can route it to that thread's client.
#[async_trait]
pub trait DirectoryOps: Send + Sync {
    /// Immediate children of `dir`, folders suffixed with `/`
    async fn list_files(&self, thread_index: usize, dir: &str) -> SbxResult<Vec<ListEntry>>;

    /// Remove a file or directory; a missing path is not an error
    async fn delete_file(&self, thread_index: usize, path: &str) -> SbxResult<()>;

    async fn move_file(&self, thread_index: usize, from: &str, to: &str) -> SbxResult<()>;

    /// Create a directory; an existing directory is not an error
    async fn create_directory(&self, thread_index: usize, dir: &str) -> SbxResult<()>;

    async fn get_file_info(&self, thread_index: usize, path: &str) -> SbxResult<FileInfo>;
}

/// Storage backend trait consumed by the backup engine
#[async_trait]
pub trait StorageBackend: DirectoryOps {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn capabilities(&self) -> &StorageCapabilities;

    /// Resolve a chunk to its path, creating shard directories as needed
    async fn find_chunk(
        &self,
        thread_index: usize,
        chunk_id: &ChunkId,
        is_fossil: bool,
    ) -> SbxResult<ChunkLocation>;

    async fn download_file(&self, thread_index: usize, path: &str) -> SbxResult<Bytes>;

    /// Write `content` to `path`, replacing any existing file
    async fn upload_file(&self, thread_index: usize, path: &str, content: Bytes) -> SbxResult<()>;
}
