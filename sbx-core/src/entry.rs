//! Listing entries and chunk lookup results

use serde::{Deserialize, Serialize};

use crate::ChunkId;

/// Immediate child of a listed directory. Folder names end with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub size: u64,
}

impl ListEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), size }
    }

    pub fn directory(name: impl AsRef<str>) -> Self {
        Self { name: format!("{}/", name.as_ref()), size: 0 }
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Name without the folder marker
    pub fn base_name(&self) -> &str {
        self.name.trim_end_matches('/')
    }
}

/// Where a chunk lives, or where it would be written if absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    /// Storage path relative to the storage root
    pub path: String,
    pub exists: bool,
    pub size: u64,
}

impl ChunkLocation {
    pub fn found(path: String, size: u64) -> Self {
        Self { path, exists: true, size }
    }

    pub fn missing(path: String) -> Self {
        Self { path, exists: false, size: 0 }
    }
}

/// Chunk discovered by walking the shard tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkListing {
    pub id: ChunkId,
    pub path: String,
    pub size: u64,
    pub is_fossil: bool,
}
