//! `me-auth-setup`: make sure the token client package is installed.

use anyhow::Context;
use clap::Parser;
use metoken::Config;
use metoken_setup::{ensure_installed, PipEnvironment};
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "me-auth-setup")]
#[command(author, version, about = "Install the authentication client package if missing", long_about = None)]
struct Cli {
    /// Package to check for
    #[arg(long)]
    package: Option<String>,

    /// Python interpreter whose pip should be used
    #[arg(long)]
    python: Option<String>,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    metoken::init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Setup failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = Config::load().context("failed to load configuration")?;

    let env = match cli.python {
        Some(python) => PipEnvironment::new(python),
        None => config.package_environment(),
    };
    let package = cli.package.as_deref().unwrap_or_else(|| config.package());

    let version = env.check_interpreter().await?;
    debug!(python = %env.python(), version = %version, "Using interpreter");

    let mut out = std::io::stdout();
    Ok(ensure_installed(&env, package, &mut out).await)
}
