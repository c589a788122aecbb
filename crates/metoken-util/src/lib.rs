//! Shared utilities for metoken.
//!
//! - Logging setup with tracing (always on stderr)
//! - Well-known directories for cache and configuration files

pub mod log;
pub mod path;

pub use log::{LogConfig, LogLevel};
