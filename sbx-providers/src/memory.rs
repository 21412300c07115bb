//! In-memory remote
//!
//! Every clone of a `MemoryClient` is an independent handle onto the same tree,
//! the way several API clients share one remote account. Folder semantics follow
//! hosted file stores: parents are created implicitly, deletes are recursive and
//! existing targets are conflicts.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use sbx_core::{normalize, ByteStream, SbxError, SbxResult, StorageCapabilities, StoragePath};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::remote::{ListFolderPage, RemoteClient, RemoteMetadata};

const DEFAULT_PAGE_SIZE: usize = 2000;
/// Open listing cursors kept before the oldest is expired
const MAX_OPEN_CURSORS: usize = 64;

/// Calls received by the remote, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ListFolder(String),
    ListFolderContinue(String),
    GetMetadata(String),
    CreateFolder(String),
    Delete(String),
    Move(String, String),
    Upload(String),
    Download(String),
}

#[derive(Debug, Clone)]
enum Node {
    Folder,
    File(Bytes),
}

#[derive(Debug)]
struct MemoryState {
    nodes: BTreeMap<String, Node>,
    cursors: BTreeMap<u64, VecDeque<RemoteMetadata>>,
    next_cursor: u64,
    page_size: usize,
    offline: bool,
    calls: Vec<RemoteCall>,
}

impl Default for MemoryState {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Folder);
        Self {
            nodes,
            cursors: BTreeMap::new(),
            next_cursor: 0,
            page_size: DEFAULT_PAGE_SIZE,
            offline: false,
            calls: Vec::new(),
        }
    }
}

fn api_error(message: impl Into<String>) -> SbxError {
    SbxError::ProviderApi { provider: "memory".into(), message: message.into() }
}

fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor || ancestor == "/" || path.starts_with(&format!("{}/", ancestor))
}

impl MemoryState {
    fn record(&mut self, call: RemoteCall) -> SbxResult<()> {
        self.calls.push(call);
        if self.offline {
            return Err(SbxError::Network("remote unreachable".into()));
        }
        Ok(())
    }

    fn metadata_of(path: &str, node: &Node) -> RemoteMetadata {
        let name = StoragePath::new(path).name().unwrap_or_default().to_string();
        match node {
            Node::Folder => RemoteMetadata::folder(name),
            Node::File(data) => RemoteMetadata::file(name, data.len() as u64),
        }
    }

    fn ensure_parents(&mut self, path: &str) -> SbxResult<()> {
        let mut ancestors = Vec::new();
        let mut current = StoragePath::new(path).parent();
        while let Some(dir) = current {
            current = dir.parent();
            ancestors.push(dir.to_path_string());
        }
        for dir in ancestors.into_iter().rev() {
            match self.nodes.get(&dir) {
                Some(Node::Folder) => {}
                Some(Node::File(_)) => return Err(SbxError::Conflict(dir)),
                None => {
                    self.nodes.insert(dir, Node::Folder);
                }
            }
        }
        Ok(())
    }

    fn page(&mut self, mut pending: VecDeque<RemoteMetadata>) -> ListFolderPage {
        let take = pending.len().min(self.page_size.max(1));
        let entries: Vec<_> = pending.drain(..take).collect();

        self.next_cursor += 1;
        let cursor = format!("cursor-{}", self.next_cursor);
        let has_more = !pending.is_empty();
        if has_more {
            self.cursors.insert(self.next_cursor, pending);
            while self.cursors.len() > MAX_OPEN_CURSORS {
                self.cursors.pop_first();
            }
        }

        ListFolderPage { entries, cursor, has_more }
    }

    fn list_folder(&mut self, path: &str) -> SbxResult<ListFolderPage> {
        let path = normalize(path);
        self.record(RemoteCall::ListFolder(path.clone()))?;
        match self.nodes.get(&path) {
            Some(Node::Folder) => {}
            Some(Node::File(_)) => return Err(api_error(format!("path/not_folder: {}", path))),
            None => return Err(SbxError::NotFound(path)),
        }

        let parent = StoragePath::new(&path);
        let children: VecDeque<_> = self
            .nodes
            .iter()
            .filter(|(p, _)| p.as_str() != "/" && StoragePath::new(p.as_str()).parent().as_ref() == Some(&parent))
            .map(|(p, node)| Self::metadata_of(p, node))
            .collect();
        Ok(self.page(children))
    }

    fn list_folder_continue(&mut self, cursor: &str) -> SbxResult<ListFolderPage> {
        self.record(RemoteCall::ListFolderContinue(cursor.to_string()))?;
        let pending = cursor
            .strip_prefix("cursor-")
            .and_then(|n| n.parse::<u64>().ok())
            .and_then(|n| self.cursors.remove(&n))
            .ok_or_else(|| api_error(format!("reset: unknown cursor {}", cursor)))?;
        Ok(self.page(pending))
    }

    fn get_metadata(&mut self, path: &str) -> SbxResult<RemoteMetadata> {
        let path = normalize(path);
        self.record(RemoteCall::GetMetadata(path.clone()))?;
        match self.nodes.get(&path) {
            Some(node) => Ok(Self::metadata_of(&path, node)),
            None => Err(SbxError::NotFound(path)),
        }
    }

    fn create_folder(&mut self, path: &str) -> SbxResult<()> {
        let path = normalize(path);
        self.record(RemoteCall::CreateFolder(path.clone()))?;
        if self.nodes.contains_key(&path) {
            return Err(SbxError::Conflict(path));
        }
        self.ensure_parents(&path)?;
        self.nodes.insert(path, Node::Folder);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> SbxResult<()> {
        let path = normalize(path);
        self.record(RemoteCall::Delete(path.clone()))?;
        if path == "/" {
            return Err(api_error("path_lookup/malformed_path: cannot delete root"));
        }
        if !self.nodes.contains_key(&path) {
            return Err(SbxError::NotFound(path));
        }
        self.nodes.retain(|p, _| !is_within(p, &path));
        Ok(())
    }

    fn move_entry(&mut self, from: &str, to: &str) -> SbxResult<()> {
        let (from, to) = (normalize(from), normalize(to));
        self.record(RemoteCall::Move(from.clone(), to.clone()))?;
        if !self.nodes.contains_key(&from) {
            return Err(SbxError::NotFound(from));
        }
        if self.nodes.contains_key(&to) {
            return Err(SbxError::Conflict(to));
        }
        if from == "/" || is_within(&to, &from) {
            return Err(api_error(format!("to/cant_move_folder_into_itself: {} -> {}", from, to)));
        }
        self.ensure_parents(&to)?;

        let moved: Vec<String> = self.nodes.keys().filter(|p| is_within(p, &from)).cloned().collect();
        for old in moved {
            if let Some(node) = self.nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                self.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn store(&mut self, path: String, data: Bytes) -> SbxResult<()> {
        if matches!(self.nodes.get(&path), Some(Node::Folder)) {
            return Err(SbxError::Conflict(path));
        }
        self.ensure_parents(&path)?;
        self.nodes.insert(path, Node::File(data));
        Ok(())
    }

    fn fetch(&mut self, path: &str) -> SbxResult<Bytes> {
        let path = normalize(path);
        self.record(RemoteCall::Download(path.clone()))?;
        match self.nodes.get(&path) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Folder) => Err(SbxError::NotAFile(path)),
            None => Err(SbxError::NotFound(path)),
        }
    }
}

/// Handle onto a shared in-memory tree
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit listing pages to `page_size` entries
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().page_size = page_size;
        self
    }

    /// Make every subsequent call fail with a network error
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Seed a file without recording a call
    pub fn put_file(&self, path: &str, data: impl Into<Bytes>) -> SbxResult<()> {
        self.state.lock().store(normalize(path), data.into())
    }

    pub fn read_file(&self, path: &str) -> Option<Bytes> {
        match self.state.lock().nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn is_folder(&self, path: &str) -> bool {
        matches!(self.state.lock().nodes.get(&normalize(path)), Some(Node::Folder))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().nodes.contains_key(&normalize(path))
    }
}

#[async_trait]
impl RemoteClient for MemoryClient {
    fn provider(&self) -> &'static str {
        "memory"
    }

    fn display_name(&self) -> &'static str {
        "In-memory"
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::in_memory()
    }

    async fn list_folder(&self, path: &str) -> SbxResult<ListFolderPage> {
        self.state.lock().list_folder(path)
    }

    async fn list_folder_continue(&self, cursor: &str) -> SbxResult<ListFolderPage> {
        self.state.lock().list_folder_continue(cursor)
    }

    async fn get_metadata(&self, path: &str) -> SbxResult<RemoteMetadata> {
        self.state.lock().get_metadata(path)
    }

    async fn create_folder(&self, path: &str) -> SbxResult<()> {
        self.state.lock().create_folder(path)
    }

    async fn delete(&self, path: &str) -> SbxResult<()> {
        self.state.lock().delete(path)
    }

    async fn move_entry(&self, from: &str, to: &str) -> SbxResult<()> {
        self.state.lock().move_entry(from, to)
    }

    async fn upload(&self, path: &str, mut body: ByteStream, size: u64) -> SbxResult<()> {
        let path = normalize(path);
        self.state.lock().record(RemoteCall::Upload(path.clone()))?;

        let mut data = BytesMut::with_capacity(size as usize);
        while let Some(block) = body.next().await {
            data.extend_from_slice(&block?);
        }
        self.state.lock().store(path, data.freeze())
    }

    async fn download(&self, path: &str) -> SbxResult<ByteStream> {
        let data = self.state.lock().fetch(path)?;
        Ok(Box::pin(stream::iter(vec![Ok(data)])))
    }
}
