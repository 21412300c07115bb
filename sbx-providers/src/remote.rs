//! Remote file API contract
//!
//! Clients speak in absolute, normalized remote paths and report failures as
//! typed errors: `SbxError::NotFound` and `SbxError::Conflict` are kept apart
//! from transport failures so the storage layer can fold them into success.

use async_trait::async_trait;
use sbx_core::{ByteStream, SbxResult, StorageCapabilities};

/// Entry type as reported by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    File,
    Folder,
}

/// Metadata of one remote entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub name: String,
    pub kind: RemoteEntryKind,
    pub size: u64,
}

impl RemoteMetadata {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), kind: RemoteEntryKind::File, size }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: RemoteEntryKind::Folder, size: 0 }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == RemoteEntryKind::Folder
    }
}

/// One page of a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFolderPage {
    pub entries: Vec<RemoteMetadata>,
    pub cursor: String,
    pub has_more: bool,
}

/// Primitives a remote must offer to host a chunk storage
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Short provider name used in backend ids and logs
    fn provider(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn capabilities(&self) -> StorageCapabilities;

    /// First page of the immediate children of `path`
    async fn list_folder(&self, path: &str) -> SbxResult<ListFolderPage>;

    async fn list_folder_continue(&self, cursor: &str) -> SbxResult<ListFolderPage>;

    async fn get_metadata(&self, path: &str) -> SbxResult<RemoteMetadata>;

    async fn create_folder(&self, path: &str) -> SbxResult<()>;

    async fn delete(&self, path: &str) -> SbxResult<()>;

    async fn move_entry(&self, from: &str, to: &str) -> SbxResult<()>;

    /// Write `body` to `path` in overwrite mode without auto-renaming
    async fn upload(&self, path: &str, body: ByteStream, size: u64) -> SbxResult<()>;

    async fn download(&self, path: &str) -> SbxResult<ByteStream>;
}
