//! Enumerate every chunk stored under the shard tree

use std::collections::VecDeque;
use tracing::warn;

use crate::{
    backend::DirectoryOps,
    chunk::{CHUNKS_DIR, FOSSIL_SUFFIX},
    entry::ChunkListing,
    error::SbxResult,
    path::StoragePath,
    ChunkId,
};

fn is_shard_name(name: &str) -> bool {
    name.len() == 2 && name.chars().all(|c| c.is_ascii_hexdigit())
}

/// Walk `/chunks` breadth first and rebuild chunk ids from shard names.
///
/// Entries that do not form a valid chunk id are skipped. A storage without a
/// chunks directory has no chunks.
pub async fn list_chunks<D>(dirs: &D, thread_index: usize) -> SbxResult<Vec<ChunkListing>>
where
    D: DirectoryOps + ?Sized,
{
    let root = StoragePath::new(CHUNKS_DIR);
    if !dirs.get_file_info(thread_index, &root.to_path_string()).await?.is_dir {
        return Ok(Vec::new());
    }

    let mut pending = VecDeque::from([(root, String::new())]);
    let mut chunks = Vec::new();

    while let Some((dir, prefix)) = pending.pop_front() {
        for entry in dirs.list_files(thread_index, &dir.to_path_string()).await? {
            let name = entry.base_name();

            if entry.is_directory() {
                if is_shard_name(name) {
                    pending.push_back((dir.join(name), format!("{}{}", prefix, name)));
                } else {
                    warn!(path = %dir.join(name), "Skipping directory that is not a shard");
                }
                continue;
            }

            let (stem, is_fossil) = match name.strip_suffix(FOSSIL_SUFFIX) {
                Some(stem) => (stem, true),
                None => (name, false),
            };
            let path = dir.join(name).to_path_string();

            match ChunkId::parse(format!("{}{}", prefix, stem)) {
                Ok(id) => chunks.push(ChunkListing { id, path, size: entry.size, is_fossil }),
                Err(e) => warn!(path = %path, error = %e, "Skipping file that is not a chunk"),
            }
        }
    }

    Ok(chunks)
}
