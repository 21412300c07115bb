//! Error types for Shardbox

use thiserror::Error;

/// Result type alias
pub type SbxResult<T> = Result<T, SbxError>;

/// Main error type
#[derive(Error, Debug)]
pub enum SbxError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Invalid chunk id '{id}': {reason}")]
    InvalidChunkId { id: String, reason: String },

    #[error("Thread index {index} out of range for {threads} client(s)")]
    InvalidThreadIndex { index: usize, threads: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Chunk {chunk_id} is still not found after searching {levels} levels of directories")]
    ChunkNestingExhausted { chunk_id: String, levels: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider API error ({provider}): {message}")]
    ProviderApi { provider: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SbxError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SbxError::Network(_) | SbxError::RateLimited { .. }
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, SbxError::AuthRequired(_) | SbxError::AuthFailed(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SbxError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SbxError::Conflict(_))
    }

    /// Errors that mean the chunk tree or its configuration is corrupt.
    /// Callers should stop instead of retrying or continuing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SbxError::ChunkNestingExhausted { .. })
    }
}
