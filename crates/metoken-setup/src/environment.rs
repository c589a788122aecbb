//! Package environments.

use crate::error::{SetupError, SetupResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// A place packages can be queried and installed.
#[async_trait]
pub trait PackageEnvironment: Send + Sync {
    /// Whether a distribution called `name` is installed.
    async fn is_installed(&self, name: &str) -> bool;

    /// Install `name`. Returns `false` if the installer fails.
    async fn install(&self, name: &str) -> bool;
}

/// The pip environment of a Python interpreter.
#[derive(Debug, Clone)]
pub struct PipEnvironment {
    python: String,
}

impl PipEnvironment {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// Interpreter used for `-m pip`.
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Check the interpreter is runnable and return its version line.
    pub async fn check_interpreter(&self) -> SetupResult<String> {
        let output = Command::new(&self.python)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SetupError::InterpreterMissing(self.python.clone())
                } else {
                    SetupError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(SetupError::Interpreter {
                program: self.python.clone(),
                code: output.status.code().unwrap_or(-1),
            });
        }

        // Python 2 printed its version on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let version = if stdout.trim().is_empty() {
            stderr.trim().to_string()
        } else {
            stdout.trim().to_string()
        };

        debug!(python = %self.python, version = %version, "Interpreter found");
        Ok(version)
    }
}

impl Default for PipEnvironment {
    fn default() -> Self {
        Self::new("python3")
    }
}

#[async_trait]
impl PackageEnvironment for PipEnvironment {
    async fn is_installed(&self, name: &str) -> bool {
        let status = Command::new(&self.python)
            .args(["-m", "pip", "show", "--quiet", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(python = %self.python, error = %e, "Failed to query pip");
                false
            }
        }
    }

    async fn install(&self, name: &str) -> bool {
        // Output is inherited so pip's progress reaches the user.
        let status = Command::new(&self.python)
            .args(["-m", "pip", "install", name])
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => {
                debug!(package = %name, code = ?status.code(), "pip install finished");
                status.success()
            }
            Err(e) => {
                warn!(python = %self.python, error = %e, "Failed to run pip");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_interpreter() {
        let env = PipEnvironment::new("metoken-no-such-python");
        assert!(matches!(
            env.check_interpreter().await,
            Err(SetupError::InterpreterMissing(_))
        ));
        assert!(!env.is_installed("anything").await);
        assert!(!env.install("anything").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_interpreter() {
        // `false --version` exits non-zero on every common coreutils.
        let env = PipEnvironment::new("false");
        assert!(matches!(
            env.check_interpreter().await,
            Err(SetupError::Interpreter { .. })
        ));
    }

    #[test]
    fn test_default_python() {
        assert_eq!(PipEnvironment::default().python(), "python3");
    }
}
