//! Chunk identifiers and on-storage naming

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SbxError, SbxResult};

/// Directory under the storage root holding the shard tree
pub const CHUNKS_DIR: &str = "/chunks";

/// Suffix marking a chunk that has been logically deleted
pub const FOSSIL_SUFFIX: &str = ".fsl";

/// Hex content hash identifying a chunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChunkId(String);

impl ChunkId {
    pub fn parse(id: impl Into<String>) -> SbxResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(SbxError::InvalidChunkId { id, reason: "empty".into() });
        }
        if let Err(e) = hex::decode(&id) {
            return Err(SbxError::InvalidChunkId { id, reason: e.to_string() });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of 2-character shard levels the id can be split into
    pub fn levels(&self) -> usize {
        self.0.len() / 2
    }

    /// Shard directory name at `level`
    pub fn shard(&self, level: usize) -> &str {
        &self.0[2 * level..2 * level + 2]
    }

    /// Remaining id used as the file name once `level` shards are consumed
    pub fn remainder(&self, level: usize) -> &str {
        &self.0[2 * level..]
    }

    /// File name for this chunk at `level`, with the fossil suffix if requested
    pub fn file_name(&self, level: usize, is_fossil: bool) -> String {
        let mut name = self.remainder(level).to_string();
        if is_fossil {
            name.push_str(FOSSIL_SUFFIX);
        }
        name
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChunkId {
    type Err = SbxError;

    fn from_str(s: &str) -> SbxResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChunkId {
    type Error = SbxError;

    fn try_from(s: String) -> SbxResult<Self> {
        Self::parse(s)
    }
}

impl From<ChunkId> for String {
    fn from(id: ChunkId) -> String {
        id.0
    }
}
