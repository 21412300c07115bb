//! Chunk locator
//!
//! Chunks are sharded under `/chunks` by successive 2-character slices of their
//! id: `ab12cd34ef` may live at `/chunks/ab12cd34ef`, `/chunks/ab/12cd34ef`,
//! `/chunks/ab/12/cd34ef` and so on. The first `minimum_nesting` shard levels are
//! always materialized; below that a level only exists once something was placed
//! in it, so lookups stop at the first missing shard directory.
//!
//! A chunk is never relocated except through an explicit move. A missing shard
//! directory past the minimum nesting therefore proves the chunk is absent, and
//! sibling layouts are never searched.

use tracing::{debug, error};

use crate::{
    backend::DirectoryOps,
    chunk::CHUNKS_DIR,
    entry::ChunkLocation,
    error::{SbxError, SbxResult},
    path::StoragePath,
    ChunkId,
};

/// Maps chunk ids to storage paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkLocator {
    minimum_nesting: usize,
}

impl ChunkLocator {
    pub fn new(minimum_nesting: usize) -> Self {
        Self { minimum_nesting }
    }

    pub fn minimum_nesting(&self) -> usize {
        self.minimum_nesting
    }

    /// Find `chunk_id` (or its fossil) through `dirs`.
    ///
    /// Returns the existing file with its size, or the path the chunk would be
    /// written to with `exists == false`. Shard directories shallower than the
    /// minimum nesting are created on the way down.
    pub async fn locate<D>(
        &self,
        dirs: &D,
        thread_index: usize,
        chunk_id: &ChunkId,
        is_fossil: bool,
    ) -> SbxResult<ChunkLocation>
    where
        D: DirectoryOps + ?Sized,
    {
        let mut dir = StoragePath::new(CHUNKS_DIR);

        for level in 0..chunk_id.levels() {
            if level >= self.minimum_nesting {
                let file_path = dir.join(chunk_id.file_name(level, is_fossil)).to_path_string();
                let info = dirs.get_file_info(thread_index, &file_path).await?;
                if info.exists {
                    debug!(chunk = %chunk_id, path = %file_path, level, "Chunk found");
                    return Ok(ChunkLocation::found(file_path, info.size));
                }
            }

            let sub_dir = dir.join(chunk_id.shard(level));
            let sub_dir_path = sub_dir.to_path_string();
            let info = dirs.get_file_info(thread_index, &sub_dir_path).await?;

            if info.exists {
                dir = sub_dir;
                continue;
            }

            if level < self.minimum_nesting {
                debug!(path = %sub_dir_path, level, "Creating shard directory");
                dirs.create_directory(thread_index, &sub_dir_path).await?;
                dir = sub_dir;
                continue;
            }

            let file_path = dir.join(chunk_id.file_name(level, is_fossil)).to_path_string();
            debug!(chunk = %chunk_id, path = %file_path, level, "Chunk not found");
            return Ok(ChunkLocation::missing(file_path));
        }

        error!(
            chunk = %chunk_id,
            levels = chunk_id.levels(),
            "Chunk is still not found after searching every directory level"
        );
        Err(SbxError::ChunkNestingExhausted {
            chunk_id: chunk_id.to_string(),
            levels: chunk_id.levels(),
        })
    }
}
