//! The persisted token record and its validity rule.

use serde::{Deserialize, Deserializer, Serialize};

/// Seconds before the real expiry at which a token is treated as expired.
pub const TOKEN_EXPIRY_BUFFER: i64 = 300;

/// Lifetime assumed for a token whose expiry cannot be decoded.
pub const DEFAULT_TOKEN_LIFETIME: i64 = 3600;

/// A cached token, stored as a flat JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// The opaque token string.
    pub token: String,
    /// Unix timestamp (seconds) after which the token is invalid.
    #[serde(deserialize_with = "unix_seconds")]
    pub expiry: i64,
    /// Unix timestamp (seconds) when the record was written. Informational.
    #[serde(default, deserialize_with = "unix_seconds")]
    pub created_at: i64,
}

impl TokenRecord {
    /// Create a record written at `now`.
    pub fn new(token: impl Into<String>, expiry: i64, now: i64) -> Self {
        Self {
            token: token.into(),
            expiry,
            created_at: now,
        }
    }

    /// Check this record against the standard buffer.
    pub fn is_valid_at(&self, now: i64) -> bool {
        is_valid(self, now, TOKEN_EXPIRY_BUFFER)
    }

    /// Whether the cached token can be handed out at `now`.
    ///
    /// An empty token is never usable, whatever its expiry.
    pub fn is_usable_at(&self, now: i64) -> bool {
        !self.token.is_empty() && self.is_valid_at(now)
    }

    /// Seconds until the real expiry (negative once expired).
    pub fn seconds_remaining(&self, now: i64) -> i64 {
        self.expiry.saturating_sub(now)
    }
}

/// Whether `record` may still be used at `now`.
///
/// Strict: a record expiring exactly at `now + buffer` is already stale.
pub fn is_valid(record: &TokenRecord, now: i64, buffer: i64) -> bool {
    record.expiry > now.saturating_add(buffer)
}

/// Accept integer or fractional Unix seconds; fractions are truncated.
///
/// Other writers of the same cache file store `time.time()` floats.
fn unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(i64),
        Float(f64),
    }

    Ok(match Seconds::deserialize(deserializer)? {
        Seconds::Int(secs) => secs,
        Seconds::Float(secs) => secs as i64,
    })
}
