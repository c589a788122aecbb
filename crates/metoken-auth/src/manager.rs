//! Cache-first token resolution.

use crate::cache::{CacheRead, TokenCache};
use crate::error::FetchError;
use crate::provider::TokenProvider;
use crate::record::DEFAULT_TOKEN_LIFETIME;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What was found at the cache path.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// A well-formed record exists.
    Present,
    /// No cache file exists.
    Missing,
    /// The file exists but could not be read or parsed.
    Corrupt,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Present => "present",
            CacheState::Missing => "missing",
            CacheState::Corrupt => "corrupt",
        }
    }
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the cache, for display. Never triggers a fetch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStatus {
    /// Location of the cache file.
    pub path: PathBuf,
    /// What was found there.
    pub state: CacheState,
    /// Unix timestamp the cached token expires at, if a record exists.
    pub expiry: Option<i64>,
    /// Unix timestamp the record was written at, if a record exists.
    pub created_at: Option<i64>,
    /// Seconds from now until `expiry`; negative once expired.
    pub seconds_remaining: Option<i64>,
    /// Whether `get_token` would serve this record without fetching.
    pub valid: bool,
    /// Why the file was unreadable, for [`CacheState::Corrupt`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resolves tokens from the cache, falling back to a provider.
pub struct TokenManager<P> {
    cache: TokenCache,
    provider: P,
}

impl<P: TokenProvider> TokenManager<P> {
    pub fn new(cache: TokenCache, provider: P) -> Self {
        Self { cache, provider }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Return a valid token, fetching a fresh one if the cache cannot serve it.
    pub async fn get_token(&self) -> Result<String, FetchError> {
        self.get_token_at(crate::current_time_secs()).await
    }

    /// [`get_token`](Self::get_token) with an explicit clock.
    pub async fn get_token_at(&self, now: i64) -> Result<String, FetchError> {
        if let Some(record) = self.cache.read_cache().await {
            if record.is_usable_at(now) {
                debug!(expiry = record.expiry, "Using cached token");
                return Ok(record.token);
            }
            debug!(expiry = record.expiry, "Cached token empty, expired or expiring soon");
        }

        self.fetch_fresh_at(now).await
    }

    /// Fetch a new token regardless of the cache state.
    pub async fn refresh(&self) -> Result<String, FetchError> {
        self.fetch_fresh_at(crate::current_time_secs()).await
    }

    /// Fetch a token from the provider, persist it, and return it.
    ///
    /// The cache is only touched after the provider succeeds. A failed write
    /// is logged and the token is still returned.
    pub async fn fetch_fresh_at(&self, now: i64) -> Result<String, FetchError> {
        debug!("Fetching fresh token");
        let token = self.provider.fetch_token().await?;

        let expiry = match self.provider.decode_expiry(&token) {
            Ok(expiry) => expiry,
            Err(e) => {
                debug!(error = %e, "Using default token lifetime");
                now + DEFAULT_TOKEN_LIFETIME
            }
        };

        if let Err(e) = self.cache.write_cache(&token, expiry, now).await {
            warn!(path = ?self.cache.path(), "Failed to save token to cache: {}", e);
        }

        Ok(token)
    }

    /// Describe the cache contents at `now`.
    pub async fn status(&self, now: i64) -> CacheStatus {
        cache_status(&self.cache, now).await
    }
}

/// Describe the contents of `cache` at `now`.
pub async fn cache_status(cache: &TokenCache, now: i64) -> CacheStatus {
    let mut status = CacheStatus {
        path: cache.path().to_path_buf(),
        state: CacheState::Missing,
        expiry: None,
        created_at: None,
        seconds_remaining: None,
        valid: false,
        error: None,
    };

    match cache.load().await {
        CacheRead::Present(record) => {
            status.state = CacheState::Present;
            status.expiry = Some(record.expiry);
            status.created_at = Some(record.created_at);
            status.seconds_remaining = Some(record.seconds_remaining(now));
            status.valid = record.is_usable_at(now);
        }
        CacheRead::Missing => {}
        CacheRead::Corrupt(e) => {
            status.state = CacheState::Corrupt;
            status.error = Some(e.to_string());
        }
    }

    status
}

impl<P> std::fmt::Debug for TokenManager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderResult};
    use crate::record::TokenRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    /// Provider returning a scripted result and counting calls.
    #[derive(Clone)]
    struct FakeProvider {
        result: Result<String, &'static str>,
        expiry: Option<i64>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn ok(token: &str, expiry: Option<i64>) -> Self {
            Self {
                result: Ok(token.to_string()),
                expiry,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(reason: &'static str) -> Self {
            Self {
                result: Err(reason),
                expiry: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenProvider for FakeProvider {
        async fn fetch_token(&self) -> ProviderResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(token) => Ok(token.clone()),
                Err("unavailable") => Err(ProviderError::Unavailable("not installed".into())),
                Err(reason) => Err(ProviderError::Failed(reason.to_string())),
            }
        }

        fn decode_expiry(&self, _token: &str) -> ProviderResult<i64> {
            self.expiry
                .ok_or_else(|| ProviderError::Decode("no exp".to_string()))
        }
    }

    fn manager(provider: FakeProvider) -> (TokenManager<FakeProvider>, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::with_path(dir.path().join(".me_tokens").join("token_cache.json"));
        (TokenManager::new(cache, provider), dir)
    }

    #[tokio::test]
    async fn test_valid_cache_skips_provider() {
        let provider = FakeProvider::ok("fresh", Some(NOW + 3600));
        let (manager, _dir) = manager(provider.clone());
        manager
            .cache()
            .write_cache("cached", NOW + 301, NOW - 10)
            .await
            .unwrap();

        let token = manager.get_token_at(NOW).await.unwrap();
        assert_eq!(token, "cached");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_expiring_cache_fetches() {
        let provider = FakeProvider::ok("fresh", Some(NOW + 7200));
        let (manager, _dir) = manager(provider.clone());
        manager
            .cache()
            .write_cache("cached", NOW + 300, NOW - 10)
            .await
            .unwrap();

        let token = manager.get_token_at(NOW).await.unwrap();
        assert_eq!(token, "fresh");
        assert_eq!(provider.calls(), 1);

        let record = manager.cache().read_cache().await.unwrap();
        assert_eq!(record, TokenRecord::new("fresh", NOW + 7200, NOW));
    }

    #[tokio::test]
    async fn test_missing_cache_fetches_and_persists() {
        let provider = FakeProvider::ok("fresh", Some(NOW + 900));
        let (manager, _dir) = manager(provider.clone());

        assert_eq!(manager.get_token_at(NOW).await.unwrap(), "fresh");
        assert_eq!(provider.calls(), 1);

        // Second call is served from the cache.
        assert_eq!(manager.get_token_at(NOW + 1).await.unwrap(), "fresh");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cache_fetches() {
        let provider = FakeProvider::ok("fresh", Some(NOW + 900));
        let (manager, _dir) = manager(provider.clone());
        let path = manager.cache().path().to_path_buf();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "garbage").unwrap();

        assert_eq!(manager.get_token_at(NOW).await.unwrap(), "fresh");
        assert_eq!(manager.cache().read_cache().await.unwrap().token, "fresh");
    }

    #[tokio::test]
    async fn test_undecodable_expiry_defaults_to_an_hour() {
        let provider = FakeProvider::ok("opaque", None);
        let (manager, _dir) = manager(provider);

        manager.get_token_at(NOW).await.unwrap();

        let record = manager.cache().read_cache().await.unwrap();
        assert_eq!(record.expiry, NOW + DEFAULT_TOKEN_LIFETIME);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_cache_untouched() {
        let provider = FakeProvider::failing("device flow declined");
        let (manager, _dir) = manager(provider.clone());
        manager
            .cache()
            .write_cache("stale", NOW - 5, NOW - 3605)
            .await
            .unwrap();
        let before = std::fs::read(manager.cache().path()).unwrap();

        let err = manager.get_token_at(NOW).await.unwrap_err();
        assert!(!err.is_unavailable());
        assert!(err.to_string().contains("device flow declined"));
        assert_eq!(provider.calls(), 1);

        let after = std::fs::read(manager.cache().path()).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_provider_unavailable_creates_no_cache() {
        let provider = FakeProvider::failing("unavailable");
        let (manager, _dir) = manager(provider);

        let err = manager.get_token_at(NOW).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!manager.cache().path().exists());
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_token() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let cache = TokenCache::with_path(blocker.join("token_cache.json"));
        let manager = TokenManager::new(cache, FakeProvider::ok("fresh", Some(NOW + 900)));

        assert_eq!(manager.get_token_at(NOW).await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_refresh_ignores_valid_cache() {
        let provider = FakeProvider::ok("fresh", Some(i64::MAX));
        let (manager, _dir) = manager(provider.clone());
        manager
            .cache()
            .write_cache("cached", i64::MAX, NOW)
            .await
            .unwrap();

        assert_eq!(manager.refresh().await.unwrap(), "fresh");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_without_fetching() {
        let provider = FakeProvider::ok("fresh", Some(NOW + 900));
        let (manager, _dir) = manager(provider.clone());

        let status = manager.status(NOW).await;
        assert_eq!(status.state, CacheState::Missing);
        assert!(!status.valid);

        manager
            .cache()
            .write_cache("cached", NOW + 1000, NOW - 5)
            .await
            .unwrap();
        let status = manager.status(NOW).await;
        assert_eq!(status.state, CacheState::Present);
        assert_eq!(status.seconds_remaining, Some(1000));
        assert_eq!(status.created_at, Some(NOW - 5));
        assert!(status.valid);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_cached_token_fetches() {
        let provider = FakeProvider::ok("fresh", Some(NOW + 900));
        let (manager, _dir) = manager(provider.clone());
        manager
            .cache()
            .write_cache("", NOW + 3600, NOW)
            .await
            .unwrap();

        assert!(!manager.status(NOW).await.valid);
        assert_eq!(manager.get_token_at(NOW).await.unwrap(), "fresh");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_status_serializes_state_lowercase() {
        let (manager, _dir) = manager(FakeProvider::ok("fresh", None));

        let value = serde_json::to_value(manager.status(NOW).await).unwrap();
        assert_eq!(value["state"], "missing");
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_status_corrupt() {
        let (manager, _dir) = manager(FakeProvider::ok("fresh", None));
        let path = manager.cache().path().to_path_buf();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[]").unwrap();

        let status = manager.status(NOW).await;
        assert_eq!(status.state, CacheState::Corrupt);
        assert!(status.error.is_some());
    }
}
