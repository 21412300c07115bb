//! In-crate directory fake for locator and walker tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::{
    backend::DirectoryOps,
    entry::ListEntry,
    error::{SbxError, SbxResult},
    metadata::FileInfo,
    path::{normalize, StoragePath},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    List(String),
    Stat(String),
    Create(String),
    Delete(String),
    Move(String, String),
}

#[derive(Default)]
pub struct FakeDirs {
    nodes: Mutex<BTreeMap<String, FileInfo>>,
    ops: Mutex<Vec<Op>>,
    offline: Mutex<bool>,
}

impl FakeDirs {
    pub fn new() -> Self {
        let dirs = Self::default();
        dirs.nodes.lock().insert("/".into(), FileInfo::directory());
        dirs
    }

    pub fn add_dir(&self, path: &str) {
        self.nodes.lock().insert(normalize(path), FileInfo::directory());
    }

    pub fn add_file(&self, path: &str, size: u64) {
        self.nodes.lock().insert(normalize(path), FileInfo::file(size));
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.nodes.lock().get(&normalize(path)).map_or(false, |i| i.is_dir)
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                Op::Create(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: Op) -> SbxResult<()> {
        self.ops.lock().push(op);
        if *self.offline.lock() {
            return Err(SbxError::Network("offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryOps for FakeDirs {
    async fn list_files(&self, _thread_index: usize, dir: &str) -> SbxResult<Vec<ListEntry>> {
        let dir = normalize(dir);
        self.record(Op::List(dir.clone()))?;
        let nodes = self.nodes.lock();
        if !nodes.get(&dir).map_or(false, |i| i.is_dir) {
            return Err(SbxError::NotFound(dir));
        }
        let parent = StoragePath::new(&dir);
        Ok(nodes
            .iter()
            .filter(|(path, _)| StoragePath::new(path.as_str()).parent().as_ref() == Some(&parent))
            .map(|(path, info)| {
                let name = StoragePath::new(path.as_str()).name().unwrap_or_default().to_string();
                if info.is_dir {
                    ListEntry::directory(name)
                } else {
                    ListEntry::file(name, info.size)
                }
            })
            .collect())
    }

    async fn delete_file(&self, _thread_index: usize, path: &str) -> SbxResult<()> {
        let path = normalize(path);
        self.record(Op::Delete(path.clone()))?;
        self.nodes.lock().remove(&path);
        Ok(())
    }

    async fn move_file(&self, _thread_index: usize, from: &str, to: &str) -> SbxResult<()> {
        let (from, to) = (normalize(from), normalize(to));
        self.record(Op::Move(from.clone(), to.clone()))?;
        let mut nodes = self.nodes.lock();
        let info = nodes.remove(&from).ok_or_else(|| SbxError::NotFound(from.clone()))?;
        nodes.insert(to, info);
        Ok(())
    }

    async fn create_directory(&self, _thread_index: usize, dir: &str) -> SbxResult<()> {
        let dir = normalize(dir);
        self.record(Op::Create(dir.clone()))?;
        self.nodes.lock().entry(dir).or_insert_with(FileInfo::directory);
        Ok(())
    }

    async fn get_file_info(&self, _thread_index: usize, path: &str) -> SbxResult<FileInfo> {
        let path = normalize(path);
        self.record(Op::Stat(path.clone()))?;
        Ok(self.nodes.lock().get(&path).copied().unwrap_or_else(FileInfo::missing))
    }
}
