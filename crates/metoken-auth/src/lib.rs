//! Token caching for metoken.
//!
//! Resolves an authentication token the cheap way first: a JSON record under
//! `~/.me_tokens/` is reused while its expiry lies more than
//! [`TOKEN_EXPIRY_BUFFER`] seconds in the future. Otherwise a
//! [`TokenProvider`] is asked for a fresh token, which is written back to the
//! cache before being returned.
//!
//! Cache problems are never fatal: an unreadable file is a miss and a failed
//! write is logged. Only a provider failure surfaces, as [`FetchError`].
//!
//! # Example
//!
//! ```no_run
//! use metoken_auth::{CommandProvider, TokenCache, TokenManager};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TokenManager::new(TokenCache::new()?, CommandProvider::default());
//!     println!("{}", manager.get_token().await?);
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod manager;
mod provider;
mod record;

pub use cache::{CacheRead, TokenCache};
pub use error::{CacheError, CacheResult, FetchError, ProviderError, ProviderResult};
pub use manager::{cache_status, CacheState, CacheStatus, TokenManager};
pub use provider::{
    decode_jwt_expiry, CommandProvider, TokenProvider, DEFAULT_PROVIDER_SNIPPET,
    PROVIDER_MISSING_EXIT_CODE, PROVIDER_MISSING_MESSAGE,
};
pub use record::{is_valid, TokenRecord, DEFAULT_TOKEN_LIFETIME, TOKEN_EXPIRY_BUFFER};

/// Get the current time in seconds since the Unix epoch.
pub fn current_time_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
