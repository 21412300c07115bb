// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI configuration file

use sbx_core::{SbxError, SbxResult, StorageConfig};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides the Dropbox token from the file
pub const TOKEN_ENV: &str = "SBX_DROPBOX_TOKEN";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Dropbox,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DropboxSection {
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub provider: Provider,
    pub storage: StorageConfig,
    pub dropbox: DropboxSection,
}

impl CliConfig {
    /// Load from `path`, or fall back to defaults when no file is given.
    /// The token environment variable wins over the file either way.
    pub fn load(path: Option<&Path>) -> SbxResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_token_override(std::env::var(TOKEN_ENV).ok());
        config.storage.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> SbxResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> SbxResult<Self> {
        toml::from_str(text).map_err(|e| SbxError::InvalidConfig(e.to_string()))
    }

    pub fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.dropbox.access_token = Some(token);
        }
    }

    pub fn access_token(&self) -> &str {
        self.dropbox.access_token.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_core::RateLimit;
    use std::io::Write;

    #[test]
    fn test_parse_full_file() {
        let config = CliConfig::parse(
            r#"
provider = "dropbox"

[storage]
storage_dir = "/backups/laptop"
threads = 4
minimum_nesting = 1
download_rate_limit = 2000

[dropbox]
access_token = "sl.file-token"
"#,
        )
        .unwrap();

        assert_eq!(config.provider, Provider::Dropbox);
        assert_eq!(config.storage.storage_dir, "/backups/laptop");
        assert_eq!(config.storage.threads, 4);
        assert_eq!(config.storage.minimum_nesting, 1);
        assert_eq!(config.storage.download_rate_limit, RateLimit::kilobytes_per_sec(2000));
        assert!(config.storage.upload_rate_limit.is_unlimited());
        assert_eq!(config.access_token(), "sl.file-token");
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let config = CliConfig::parse("provider = \"memory\"").unwrap();

        assert_eq!(config.provider, Provider::Memory);
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.access_token(), "");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = CliConfig::parse("provider = \"ftp\"").unwrap_err();
        assert!(matches!(err, SbxError::InvalidConfig(_)));
    }

    #[test]
    fn test_token_override() {
        let mut config = CliConfig::parse("[dropbox]\naccess_token = \"from-file\"").unwrap();

        config.apply_token_override(Some(String::new()));
        assert_eq!(config.access_token(), "from-file");

        config.apply_token_override(Some("from-env".into()));
        assert_eq!(config.access_token(), "from-env");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nstorage_dir = \"repo\"\nthreads = 2").unwrap();

        let config = CliConfig::from_file(file.path()).unwrap();

        assert_eq!(config.storage.storage_dir, "repo");
        assert_eq!(config.storage.threads, 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SbxError::Io(_)));
    }
}
