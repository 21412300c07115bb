//! Chunk storage on top of any `RemoteClient`

use async_trait::async_trait;
use bytes::Bytes;
use sbx_core::{
    rate::{rate_limited_copy, rate_limited_stream},
    ChunkId, ChunkLocation, ChunkLocator, DirectoryOps, FileInfo, ListEntry, RateLimit,
    SbxError, SbxResult, StorageBackend, StorageCapabilities, StorageConfig, StoragePath,
};
use tracing::{debug, error, info};

use crate::pool::ClientPool;
use crate::remote::RemoteClient;

/// Storage backend rooted at a directory of a remote file store.
///
/// Paths handed to its methods are relative to the storage root and are
/// normalized before reaching the remote.
pub struct ChunkStorage<C> {
    id: String,
    display_name: String,
    clients: ClientPool<C>,
    storage_dir: StoragePath,
    locator: ChunkLocator,
    download_limit: RateLimit,
    upload_limit: RateLimit,
    capabilities: StorageCapabilities,
}

impl<C: RemoteClient> ChunkStorage<C> {
    /// Build the storage and make sure its root directory exists.
    ///
    /// The pool must hold exactly one client per configured thread.
    pub async fn create(clients: ClientPool<C>, config: &StorageConfig) -> SbxResult<Self> {
        config.validate()?;
        if clients.len() != config.threads {
            return Err(SbxError::InvalidConfig(format!(
                "{} client(s) supplied for {} configured thread(s)",
                clients.len(),
                config.threads
            )));
        }

        let first = clients.get(0)?;
        let storage_dir = StoragePath::new(&config.storage_dir);
        let client_count = clients.len();

        let storage = Self {
            id: format!("{}:{}", first.provider(), storage_dir),
            display_name: first.display_name().to_string(),
            capabilities: first.capabilities(),
            locator: ChunkLocator::new(config.minimum_nesting),
            download_limit: config.download_rate_limit.share(client_count),
            upload_limit: config.upload_rate_limit.share(client_count),
            storage_dir,
            clients,
        };

        if !storage.storage_dir.is_root() {
            if let Err(e) = storage.create_directory(0, "").await {
                error!(storage = %storage.id, error = %e, "Can't create storage directory");
                return Err(e);
            }
        }

        info!(
            storage = %storage.id,
            clients = client_count,
            minimum_nesting = config.minimum_nesting,
            "Chunk storage ready"
        );
        Ok(storage)
    }

    pub fn storage_dir(&self) -> &StoragePath {
        &self.storage_dir
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn locator(&self) -> &ChunkLocator {
        &self.locator
    }

    /// Per-client download ceiling
    pub fn download_limit(&self) -> RateLimit {
        self.download_limit
    }

    /// Per-client upload ceiling
    pub fn upload_limit(&self) -> RateLimit {
        self.upload_limit
    }

    /// Absolute remote path for a path relative to the storage root
    pub fn remote_path(&self, path: &str) -> String {
        self.storage_dir.resolve(&StoragePath::new(path)).to_path_string()
    }
}

#[async_trait]
impl<C: RemoteClient> DirectoryOps for ChunkStorage<C> {
    async fn list_files(&self, thread_index: usize, dir: &str) -> SbxResult<Vec<ListEntry>> {
        let client = self.clients.get(thread_index)?;
        let mut page = client.list_folder(&self.remote_path(dir)).await?;
        let mut entries = Vec::new();

        loop {
            entries.extend(page.entries.into_iter().map(|entry| {
                if entry.is_folder() {
                    ListEntry::directory(entry.name)
                } else {
                    ListEntry::file(entry.name, entry.size)
                }
            }));

            if !page.has_more {
                break;
            }
            page = client.list_folder_continue(&page.cursor).await?;
        }

        Ok(entries)
    }

    async fn delete_file(&self, thread_index: usize, path: &str) -> SbxResult<()> {
        let remote = self.remote_path(path);
        match self.clients.get(thread_index)?.delete(&remote).await {
            Err(e) if e.is_not_found() => {
                debug!(path = %remote, "Delete target already gone");
                Ok(())
            }
            result => result,
        }
    }

    async fn move_file(&self, thread_index: usize, from: &str, to: &str) -> SbxResult<()> {
        self.clients
            .get(thread_index)?
            .move_entry(&self.remote_path(from), &self.remote_path(to))
            .await
    }

    async fn create_directory(&self, thread_index: usize, dir: &str) -> SbxResult<()> {
        let remote = self.remote_path(dir);
        match self.clients.get(thread_index)?.create_folder(&remote).await {
            Err(e) if e.is_conflict() => {
                debug!(path = %remote, "Directory already exists");
                Ok(())
            }
            result => result,
        }
    }

    async fn get_file_info(&self, thread_index: usize, path: &str) -> SbxResult<FileInfo> {
        match self.clients.get(thread_index)?.get_metadata(&self.remote_path(path)).await {
            Ok(meta) if meta.is_folder() => Ok(FileInfo::directory()),
            Ok(meta) => Ok(FileInfo::file(meta.size)),
            Err(e) if e.is_not_found() => Ok(FileInfo::missing()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<C: RemoteClient> StorageBackend for ChunkStorage<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn capabilities(&self) -> &StorageCapabilities {
        &self.capabilities
    }

    async fn find_chunk(
        &self,
        thread_index: usize,
        chunk_id: &ChunkId,
        is_fossil: bool,
    ) -> SbxResult<ChunkLocation> {
        self.locator.locate(self, thread_index, chunk_id, is_fossil).await
    }

    async fn download_file(&self, thread_index: usize, path: &str) -> SbxResult<Bytes> {
        let client = self.clients.get(thread_index)?;
        let stream = client.download(&self.remote_path(path)).await?;
        rate_limited_copy(stream, self.download_limit).await
    }

    async fn upload_file(&self, thread_index: usize, path: &str, content: Bytes) -> SbxResult<()> {
        let client = self.clients.get(thread_index)?;
        let size = content.len() as u64;
        let body = rate_limited_stream(content, self.upload_limit);
        client.upload(&self.remote_path(path), body, size).await
    }
}
