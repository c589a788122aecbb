//! Configuration loading.
//!
//! Sources, later overriding earlier:
//! 1. `~/.config/metoken/config.json`
//! 2. the `METOKEN_CONFIG_CONTENT` environment variable
//! 3. command-line flags (applied by the binaries)

use metoken_auth::CommandProvider;
use metoken_setup::PipEnvironment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding inline JSON configuration.
pub const CONFIG_CONTENT_ENV: &str = "METOKEN_CONFIG_CONTENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config content is not valid JSON for this schema.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Override for the token cache file. `~/` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,
    pub provider: ProviderConfig,
    pub setup: SetupConfig,
}

/// How to run the external token provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Program to run. Defaults to `python3`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Arguments. Defaults to the built-in `me_auth_client` snippet when
    /// `program` is unset or is a Python interpreter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

/// Dependency installer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SetupConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl Config {
    /// Load configuration from the global file and the environment.
    pub fn load() -> ConfigResult<Self> {
        let mut config = Config::default();

        if let Some(path) = metoken_util::path::config_file() {
            if path.exists() {
                config = config.merge(Self::load_file(&path)?);
            }
        }

        if let Ok(content) = std::env::var(CONFIG_CONTENT_ENV) {
            if !content.trim().is_empty() {
                config = config.merge(Self::parse(&content, "<env>")?);
            }
        }

        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse configuration JSON. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            cache_file: other.cache_file.or(self.cache_file),
            provider: ProviderConfig {
                program: other.provider.program.or(self.provider.program),
                args: other.provider.args.or(self.provider.args),
            },
            setup: SetupConfig {
                python: other.setup.python.or(self.setup.python),
                package: other.setup.package.or(self.setup.package),
            },
        }
    }

    /// The configured cache file, with `~/` expanded.
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.cache_file
            .as_deref()
            .map(metoken_util::path::expand_home)
    }

    /// Build the token provider described by this configuration.
    pub fn token_provider(&self) -> CommandProvider {
        match (&self.provider.program, &self.provider.args) {
            (None, None) => CommandProvider::default(),
            (Some(program), None) => CommandProvider::python(program.clone()),
            (program, Some(args)) => CommandProvider::new(
                program.clone().unwrap_or_else(|| "python3".to_string()),
                args.clone(),
            ),
        }
    }

    /// Build the package environment described by this configuration.
    pub fn package_environment(&self) -> PipEnvironment {
        match &self.setup.python {
            Some(python) => PipEnvironment::new(python.clone()),
            None => PipEnvironment::default(),
        }
    }

    /// Package the installer should ensure.
    pub fn package(&self) -> &str {
        self.setup
            .package
            .as_deref()
            .unwrap_or(metoken_setup::DEFAULT_PACKAGE)
    }
}
