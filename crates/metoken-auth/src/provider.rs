//! Token providers.
//!
//! A provider is the external party that actually authenticates. metoken only
//! asks it for a token and, optionally, for the token's expiry.

use crate::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use base64::Engine;
use std::io::Write;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Exit code the default provider snippet uses when the client package is missing.
pub const PROVIDER_MISSING_EXIT_CODE: i32 = 3;

/// Message reported when the client package cannot be imported.
pub const PROVIDER_MISSING_MESSAGE: &str = "me_auth_client module not found. Please install it.";

/// Python snippet run by the default provider command.
///
/// Anything the client prints while authenticating (device-flow prompts)
/// goes to stderr, so stdout carries only the token.
pub const DEFAULT_PROVIDER_SNIPPET: &str = "\
import contextlib
import sys
try:
    from me_auth_client import meezeh_app
except ImportError:
    sys.exit(3)
with contextlib.redirect_stdout(sys.stderr):
    token = meezeh_app.get_token_with_device_flow_fallback()
print(token)
";

/// Source of fresh tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a new token, using the provider's device-flow fallback if needed.
    async fn fetch_token(&self) -> ProviderResult<String>;

    /// Read the token's expiry claim as a Unix timestamp.
    fn decode_expiry(&self, token: &str) -> ProviderResult<i64> {
        decode_jwt_expiry(token)
    }
}

/// Extract the `exp` claim from a JWT payload without verifying it.
pub fn decode_jwt_expiry(token: &str) -> ProviderResult<i64> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ProviderError::Decode("token has no payload segment".to_string()))?;

    // Some issuers pad the segment; the URL-safe alphabet never needs it.
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    let claims: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let exp = claims
        .get("exp")
        .ok_or_else(|| ProviderError::Decode("payload has no exp claim".to_string()))?;

    exp.as_i64()
        .or_else(|| exp.as_f64().map(|f| f as i64))
        .ok_or_else(|| ProviderError::Decode(format!("exp claim is not a number: {exp}")))
}

/// Provider that runs an external command and reads the token from its stdout.
///
/// stdin and stderr are inherited so interactive device-flow prompts reach
/// the user. The last non-empty stdout line is the token; any earlier
/// stdout lines are echoed to stderr.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    /// Create a provider running `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The default provider: `python3 -c <snippet>` using `me_auth_client`.
    pub fn python(python: impl Into<String>) -> Self {
        Self::new(
            python,
            vec!["-c".to_string(), DEFAULT_PROVIDER_SNIPPET.to_string()],
        )
    }

    /// Program that will be run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for CommandProvider {
    fn default() -> Self {
        Self::python("python3")
    }
}

#[async_trait]
impl TokenProvider for CommandProvider {
    async fn fetch_token(&self) -> ProviderResult<String> {
        debug!(program = %self.program, "Running token provider");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProviderError::Unavailable(format!(
                        "token provider '{}' not found",
                        self.program
                    ))
                } else {
                    ProviderError::Failed(format!("could not run '{}': {}", self.program, e))
                }
            })?;

        // Only the last non-empty line is the token. Earlier lines are
        // prompts meant for the user and are passed through to stderr.
        let mut last: Option<String> = None;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await.map_err(|e| {
                ProviderError::Failed(format!("could not read from '{}': {}", self.program, e))
            })? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(previous) = last.replace(line.to_string()) {
                    let _ = writeln!(std::io::stderr(), "{previous}");
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            ProviderError::Failed(format!("could not wait for '{}': {}", self.program, e))
        })?;

        if !status.success() {
            if let Some(line) = &last {
                let _ = writeln!(std::io::stderr(), "{line}");
            }
            return Err(match status.code() {
                Some(PROVIDER_MISSING_EXIT_CODE) => {
                    ProviderError::Unavailable(PROVIDER_MISSING_MESSAGE.to_string())
                }
                Some(code) => ProviderError::Failed(format!(
                    "'{}' exited with status {}",
                    self.program, code
                )),
                None => ProviderError::Failed(format!(
                    "'{}' was terminated by a signal",
                    self.program
                )),
            });
        }

        last.ok_or_else(|| ProviderError::Failed(format!("'{}' printed no token", self.program)))
    }
}
