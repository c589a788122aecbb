//! Error types for token cache and provider operations.

use thiserror::Error;

/// Errors reading or writing the cache file.
///
/// These are always recoverable: a failed read is a cache miss and a failed
/// write only costs the next invocation a fetch.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to read or write the cache file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache file does not hold a valid record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Could not determine the home directory.
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Failed to set file permissions.
    #[error("Failed to set file permissions: {0}")]
    Permissions(String),
}

/// Errors raised by a token provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider is not installed or cannot be started.
    #[error("{0}")]
    Unavailable(String),

    /// The provider ran but did not produce a token.
    #[error("Failed to get token: {0}")]
    Failed(String),

    /// The token payload could not be decoded.
    #[error("Failed to decode token payload: {0}")]
    Decode(String),
}

/// Fatal error returned when no valid token can be produced.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct FetchError(#[from] ProviderError);

impl FetchError {
    /// Whether the provider itself is missing, as opposed to failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.0, ProviderError::Unavailable(_))
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
