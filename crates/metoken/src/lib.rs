//! Shared pieces of the `me-token` and `me-auth-setup` binaries.

pub mod config;

pub use config::{Config, ConfigError};

use std::backtrace::{Backtrace, BacktraceStatus};

/// Print a fatal error as `ERROR: <message>`, its causes, and a stack trace.
///
/// The trace is the one captured with the error when `RUST_BACKTRACE` is set,
/// and a trace of the reporting site otherwise.
pub fn report_error(err: &anyhow::Error) {
    eprintln!("ERROR: {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }

    eprintln!("Stack trace:");
    let captured = err.backtrace();
    if captured.status() == BacktraceStatus::Captured {
        eprintln!("{captured}");
    } else {
        eprintln!("{}", Backtrace::force_capture());
    }
}

/// Initialize stderr logging for a binary.
pub fn init_logging(verbose: bool) {
    metoken_util::log::init(metoken_util::LogConfig {
        level: metoken_util::LogLevel::from_verbose(verbose),
    });
}
