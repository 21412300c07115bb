// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use bytes::Bytes;
use console::style;
use sbx_core::{
    list_chunks, ChunkId, ChunkListing, ListEntry, SbxResult, StorageBackend, StorageCapabilities,
};
use sbx_providers::{open_dropbox_storage, open_memory_storage, MemoryClient};
use std::io::Write;
use std::path::Path;
use tabled::{Table, Tabled};
use tracing::info;

use crate::config::{CliConfig, Provider};

/// All commands run on the first client of the pool
const THREAD: usize = 0;

/// Open the storage the configuration points at
pub async fn open_storage(config: &CliConfig) -> SbxResult<Box<dyn StorageBackend>> {
    info!(
        provider = ?config.provider,
        storage_dir = %config.storage.normalized_storage_dir(),
        threads = config.storage.threads,
        "Opening storage"
    );
    match config.provider {
        Provider::Dropbox => Ok(Box::new(
            open_dropbox_storage(config.access_token(), &config.storage).await?,
        )),
        Provider::Memory => Ok(Box::new(
            open_memory_storage(&MemoryClient::new(), &config.storage).await?,
        )),
    }
}

/// Format file size
fn format_size(size: u64, human: bool) -> String {
    if human {
        bytesize::ByteSize(size).to_string()
    } else {
        size.to_string()
    }
}

fn format_flag(flag: bool) -> String {
    if flag {
        style("yes").green().to_string()
    } else {
        style("no").red().to_string()
    }
}

#[derive(Tabled)]
struct LsRow {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl LsRow {
    fn new(entry: &ListEntry, human: bool) -> Self {
        if entry.is_directory() {
            Self {
                kind: style("d").cyan().to_string(),
                size: "-".to_string(),
                name: entry.base_name().to_string(),
            }
        } else {
            Self {
                kind: "-".to_string(),
                size: format_size(entry.size, human),
                name: entry.name.clone(),
            }
        }
    }
}

#[derive(Tabled)]
struct ChunkRow {
    #[tabled(rename = "Chunk")]
    id: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Fossil")]
    fossil: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl ChunkRow {
    fn new(chunk: &ChunkListing, human: bool) -> Self {
        Self {
            id: chunk.id.to_string(),
            size: format_size(chunk.size, human),
            fossil: if chunk.is_fossil { "fossil".into() } else { String::new() },
            path: chunk.path.clone(),
        }
    }
}

/// List directory contents
pub async fn ls(storage: &dyn StorageBackend, dir: &str, long: bool, human: bool) -> SbxResult<()> {
    let entries = storage.list_files(THREAD, dir).await?;

    if entries.is_empty() {
        println!("(empty directory)");
    } else if long {
        let rows: Vec<LsRow> = entries.iter().map(|e| LsRow::new(e, human)).collect();
        println!("{}", Table::new(rows));
    } else {
        for entry in &entries {
            println!("{}", entry.name);
        }
    }

    Ok(())
}

/// Show file or directory information
pub async fn stat(storage: &dyn StorageBackend, path: &str) -> SbxResult<()> {
    let info = storage.get_file_info(THREAD, path).await?;

    println!("  Path: {}", sbx_core::normalize(path));
    if !info.exists {
        println!("  {}", style("does not exist").yellow());
        return Ok(());
    }
    if info.is_dir {
        println!("  Type: directory");
    } else {
        println!("  Type: file");
        println!("  Size: {} ({})", info.size, bytesize::ByteSize(info.size));
    }

    Ok(())
}

/// Create directories
pub async fn mkdir(storage: &dyn StorageBackend, paths: &[String]) -> SbxResult<()> {
    for path in paths {
        storage.create_directory(THREAD, path).await?;
        println!("Created {}", path);
    }
    Ok(())
}

/// Remove files
pub async fn rm(storage: &dyn StorageBackend, paths: &[String]) -> SbxResult<()> {
    for path in paths {
        storage.delete_file(THREAD, path).await?;
        println!("Removed {}", path);
    }
    Ok(())
}

/// Move/rename a file
pub async fn mv(storage: &dyn StorageBackend, from: &str, to: &str) -> SbxResult<()> {
    storage.move_file(THREAD, from, to).await?;
    println!("Moved {} -> {}", from, to);
    Ok(())
}

/// Locate a chunk, creating the minimum shard directories on the way
pub async fn find_chunk(storage: &dyn StorageBackend, id: &str, fossil: bool) -> SbxResult<()> {
    let chunk_id = ChunkId::parse(id)?;
    let location = storage.find_chunk(THREAD, &chunk_id, fossil).await?;

    println!("  Path: {}", location.path);
    if location.exists {
        println!("  Found: {}", style("yes").green());
        println!("  Size: {} ({})", location.size, bytesize::ByteSize(location.size));
    } else {
        println!("  Found: {}", style("no").yellow());
    }

    Ok(())
}

/// List every chunk in the storage
pub async fn chunks(storage: &dyn StorageBackend, human: bool) -> SbxResult<()> {
    let chunks = list_chunks(storage, THREAD).await?;

    if chunks.is_empty() {
        println!("(no chunks)");
        return Ok(());
    }

    let total: u64 = chunks.iter().map(|c| c.size).sum();
    let fossils = chunks.iter().filter(|c| c.is_fossil).count();
    let rows: Vec<ChunkRow> = chunks.iter().map(|c| ChunkRow::new(c, human)).collect();
    println!("{}", Table::new(rows));
    println!(
        "{} chunks ({} fossils), {}",
        chunks.len(),
        fossils,
        bytesize::ByteSize(total)
    );

    Ok(())
}

/// Download a file to a local path or stdout
pub async fn get(storage: &dyn StorageBackend, path: &str, out: Option<&Path>) -> SbxResult<()> {
    let content = storage.download_file(THREAD, path).await?;

    match out {
        Some(out) => {
            tokio::fs::write(out, &content).await?;
            eprintln!("Downloaded {} ({})", path, bytesize::ByteSize(content.len() as u64));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Upload a local file
pub async fn put(storage: &dyn StorageBackend, file: &Path, path: &str) -> SbxResult<()> {
    let content = Bytes::from(tokio::fs::read(file).await?);
    let size = content.len() as u64;

    storage.upload_file(THREAD, path, content).await?;
    println!("Uploaded {} -> {} ({})", file.display(), path, bytesize::ByteSize(size));
    Ok(())
}

/// Show what the storage backend supports
pub async fn caps(storage: &dyn StorageBackend) -> SbxResult<()> {
    let StorageCapabilities {
        needs_local_cache,
        supports_move,
        strongly_consistent,
        fast_listing,
    } = *storage.capabilities();

    println!("Storage: {} ({})", storage.id(), storage.display_name());
    println!("  Needs local cache:   {}", format_flag(needs_local_cache));
    println!("  Supports move:       {}", format_flag(supports_move));
    println!("  Strongly consistent: {}", format_flag(strongly_consistent));
    println!("  Fast listing:        {}", format_flag(fast_listing));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_core::StorageConfig;

    async fn memory_storage() -> Box<dyn StorageBackend> {
        let config = CliConfig {
            provider: Provider::Memory,
            storage: StorageConfig::new("/repo").with_minimum_nesting(1),
            ..Default::default()
        };
        open_storage(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_dropbox_without_token_is_rejected() {
        let config = CliConfig { provider: Provider::Dropbox, ..Default::default() };
        let err = open_storage(&config).await.err().unwrap();
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(1536, false), "1536");
        assert_ne!(format_size(1536, true), "1536");
    }

    #[test]
    fn test_ls_row_for_directory() {
        let row = LsRow::new(&ListEntry::directory("ab"), true);
        assert_eq!(row.name, "ab");
        assert_eq!(row.size, "-");

        let row = LsRow::new(&ListEntry::file("config", 12), false);
        assert_eq!(row.name, "config");
        assert_eq!(row.size, "12");
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let storage = memory_storage().await;
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("snapshot");
        let target = dir.path().join("restored");
        std::fs::write(&source, b"snapshot body").unwrap();

        put(storage.as_ref(), &source, "snapshots/host/1").await.unwrap();
        get(storage.as_ref(), "snapshots/host/1", Some(&target)).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"snapshot body");
    }

    #[tokio::test]
    async fn test_find_chunk_rejects_malformed_id() {
        let storage = memory_storage().await;
        assert!(find_chunk(storage.as_ref(), "not-hex", false).await.is_err());
    }

    #[tokio::test]
    async fn test_commands_against_memory_storage() {
        let storage = memory_storage().await;

        mkdir(storage.as_ref(), &["snapshots".to_string()]).await.unwrap();
        find_chunk(storage.as_ref(), "ab12cd34ef", false).await.unwrap();
        storage
            .upload_file(THREAD, "/chunks/ab/12cd34ef", Bytes::from_static(b"chunk"))
            .await
            .unwrap();
        mv(storage.as_ref(), "/chunks/ab/12cd34ef", "/chunks/ab/12cd34ef.fsl")
            .await
            .unwrap();

        let listed = list_chunks(storage.as_ref(), THREAD).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_fossil);

        chunks(storage.as_ref(), true).await.unwrap();
        rm(storage.as_ref(), &["/chunks/ab/12cd34ef.fsl".to_string()]).await.unwrap();
        assert!(list_chunks(storage.as_ref(), THREAD).await.unwrap().is_empty());
        caps(storage.as_ref()).await.unwrap();
    }
}
