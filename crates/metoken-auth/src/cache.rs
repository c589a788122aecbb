//! File-backed token cache.

use crate::error::{CacheError, CacheResult};
use crate::record::TokenRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of loading the cache file.
#[derive(Debug)]
pub enum CacheRead {
    /// A well-formed record was found. It may still be expired.
    Present(TokenRecord),
    /// No cache file exists yet.
    Missing,
    /// The file exists but could not be read or parsed.
    Corrupt(CacheError),
}

/// Handle to the on-disk token cache.
///
/// Holds only the path. Every operation opens and closes the file itself,
/// so no descriptor outlives a call.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Create a cache at the default location (`~/.me_tokens/token_cache.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> CacheResult<Self> {
        let path = metoken_util::path::token_cache_file().ok_or(CacheError::NoHomeDir)?;
        Ok(Self { path })
    }

    /// Create a cache backed by a custom file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache file, distinguishing absent from corrupt.
    pub async fn load(&self) -> CacheRead {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheRead::Missing,
            Err(e) => return CacheRead::Corrupt(e.into()),
        };

        match serde_json::from_str::<TokenRecord>(&content) {
            Ok(record) => CacheRead::Present(record),
            Err(e) => CacheRead::Corrupt(e.into()),
        }
    }

    /// Read the cached record.
    ///
    /// A corrupt file is logged and reported as absent.
    pub async fn read_cache(&self) -> Option<TokenRecord> {
        match self.load().await {
            CacheRead::Present(record) => Some(record),
            CacheRead::Missing => {
                debug!(path = ?self.path, "No token cache file");
                None
            }
            CacheRead::Corrupt(e) => {
                warn!(path = ?self.path, "Cache error: {}", e);
                None
            }
        }
    }

    /// Persist `token` with its `expiry`, stamped with `now`.
    ///
    /// Overwrites any existing record.
    pub async fn write_cache(&self, token: &str, expiry: i64, now: i64) -> CacheResult<()> {
        let record = TokenRecord::new(token, expiry, now);
        self.write_record(&record).await
    }

    /// Persist a complete record.
    pub async fn write_record(&self, record: &TokenRecord) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent).await?;
        }

        let content = serde_json::to_string(record)?;
        tokio::fs::write(&self.path, &content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms)
                .await
                .map_err(|e| {
                    CacheError::Permissions(format!(
                        "Failed to set permissions on {:?}: {}",
                        self.path, e
                    ))
                })?;
        }

        debug!(path = ?self.path, expiry = record.expiry, "Wrote token cache");
        Ok(())
    }
}

/// Create `dir` if missing. A directory created here is owner-only on Unix.
async fn ensure_private_dir(dir: &Path) -> CacheResult<()> {
    if dir.as_os_str().is_empty() || tokio::fs::try_exists(dir).await? {
        return Ok(());
    }

    tokio::fs::create_dir_all(dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(dir, perms).await.map_err(|e| {
            CacheError::Permissions(format!("Failed to set permissions on {:?}: {}", dir, e))
        })?;
    }

    Ok(())
}
