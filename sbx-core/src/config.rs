//! Storage configuration

use serde::{Deserialize, Serialize};

use crate::{
    error::{SbxError, SbxResult},
    path::normalize,
    rate::RateLimit,
};

fn default_threads() -> usize {
    1
}

/// Settings shared by every chunk storage, whatever the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the storage on the remote
    #[serde(default)]
    pub storage_dir: String,
    /// One remote client is created per worker thread
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Shard levels that are always created before probing for chunk files
    #[serde(default)]
    pub minimum_nesting: usize,
    #[serde(default)]
    pub download_rate_limit: RateLimit,
    #[serde(default)]
    pub upload_rate_limit: RateLimit,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: String::new(),
            threads: default_threads(),
            minimum_nesting: 0,
            download_rate_limit: RateLimit::unlimited(),
            upload_rate_limit: RateLimit::unlimited(),
        }
    }
}

impl StorageConfig {
    pub fn new(storage_dir: impl Into<String>) -> Self {
        Self { storage_dir: storage_dir.into(), ..Default::default() }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_minimum_nesting(mut self, minimum_nesting: usize) -> Self {
        self.minimum_nesting = minimum_nesting;
        self
    }

    pub fn with_rate_limits(mut self, download: RateLimit, upload: RateLimit) -> Self {
        self.download_rate_limit = download;
        self.upload_rate_limit = upload;
        self
    }

    /// Storage root in canonical form
    pub fn normalized_storage_dir(&self) -> String {
        normalize(&self.storage_dir)
    }

    pub fn validate(&self) -> SbxResult<()> {
        if self.threads == 0 {
            return Err(SbxError::InvalidConfig("threads must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: StorageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.threads, 1);
        assert!(config.download_rate_limit.is_unlimited());
    }

    #[test]
    fn test_rate_limits_are_plain_numbers() {
        let config: StorageConfig = serde_json::from_str(
            r#"{"storage_dir": "backups/", "threads": 4, "minimum_nesting": 1, "download_rate_limit": 800}"#,
        )
        .unwrap();
        assert_eq!(config.normalized_storage_dir(), "/backups");
        assert_eq!(config.download_rate_limit, RateLimit::kilobytes_per_sec(800));
        assert!(config.upload_rate_limit.is_unlimited());
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        assert!(StorageConfig::new("/x").with_threads(0).validate().is_err());
        assert!(StorageConfig::new("/x").with_threads(2).validate().is_ok());
    }
}
