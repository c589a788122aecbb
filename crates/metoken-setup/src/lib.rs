//! Dependency installer for metoken.
//!
//! The token provider lives in an external Python package. This crate checks
//! whether that package is present in a [`PackageEnvironment`] and installs it
//! when it is missing, reporting progress as plain status lines.

mod environment;
mod error;

pub use environment::{PackageEnvironment, PipEnvironment};
pub use error::{SetupError, SetupResult};

use std::io::Write;
use tracing::debug;

/// Distribution that provides the token client.
pub const DEFAULT_PACKAGE: &str = "me-auth-client";

/// Make sure `package` is installed in `env`.
///
/// Status lines are written to `out`. Returns `true` if the package was
/// already present or was installed successfully.
pub async fn ensure_installed<E>(env: &E, package: &str, out: &mut dyn Write) -> bool
where
    E: PackageEnvironment + ?Sized,
{
    say(out, format_args!("Checking for {package}..."));

    if env.is_installed(package).await {
        say(out, format_args!("{package} is already installed."));
        return true;
    }

    say(
        out,
        format_args!("{package} not found. Attempting to install..."),
    );

    if env.install(package).await {
        say(out, format_args!("Successfully installed {package}."));
        true
    } else {
        say(out, format_args!("Failed to install {package}."));
        say(out, format_args!("You may need to install it manually:"));
        say(out, format_args!("  pip install {package}"));
        false
    }
}

/// Status output is best effort; a closed stdout must not change the result.
fn say(out: &mut dyn Write, line: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        debug!(error = %e, "Failed to write status line");
    }
}
