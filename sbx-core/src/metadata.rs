//! File and directory metadata

use serde::{Deserialize, Serialize};

/// Result of a stat call. A missing path is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub exists: bool,
    pub is_dir: bool,
    pub size: u64,
}

impl FileInfo {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn file(size: u64) -> Self {
        Self { exists: true, is_dir: false, size }
    }

    pub fn directory() -> Self {
        Self { exists: true, is_dir: true, size: 0 }
    }
}
