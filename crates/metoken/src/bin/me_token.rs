//! `me-token`: print a valid authentication token.
//!
//! On success stdout carries the token and nothing else, so callers can
//! capture it directly.

use anyhow::Context;
use clap::{Parser, Subcommand};
use metoken::Config;
use metoken_auth::{cache_status, CacheStatus, FetchError, TokenCache, TokenManager};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "me-token")]
#[command(author, version, about = "Print a cached or freshly fetched authentication token", long_about = None)]
struct Cli {
    /// Token cache file (default: ~/.me_tokens/token_cache.json)
    #[arg(long, global = true)]
    cache_file: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ignore the cache and always fetch a new token
    #[arg(long)]
    refresh: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe the token cache without fetching
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    metoken::init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            metoken::report_error(&err);
            if err
                .downcast_ref::<FetchError>()
                .is_some_and(FetchError::is_unavailable)
            {
                eprintln!("Run `me-auth-setup` to install the authentication client.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let cache = resolve_cache(cli.cache_file, &config)?;

    match cli.command {
        Some(Commands::Status { json }) => {
            let status = cache_status(&cache, metoken_auth::current_time_secs()).await;
            print_status(&status, json)
        }
        None => {
            let manager = TokenManager::new(cache, config.token_provider());
            let token = if cli.refresh {
                manager.refresh().await?
            } else {
                manager.get_token().await?
            };
            println!("{token}");
            Ok(())
        }
    }
}

fn resolve_cache(flag: Option<PathBuf>, config: &Config) -> anyhow::Result<TokenCache> {
    if let Some(path) = flag.or_else(|| config.cache_file()) {
        return Ok(TokenCache::with_path(path));
    }
    TokenCache::new().context("could not determine the token cache location; pass --cache-file")
}

fn print_status(status: &CacheStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }

    println!("Cache file: {}", status.path.display());
    println!("State:      {}", status.state);
    if let Some(expiry) = status.expiry {
        let remaining = status.seconds_remaining.unwrap_or_default();
        let when = if remaining >= 0 {
            format!("in {remaining}s")
        } else {
            format!("{}s ago", -remaining)
        };
        println!("Expires:    {} ({when})", format_timestamp(expiry));
    }
    if let Some(created_at) = status.created_at {
        println!("Written:    {}", format_timestamp(created_at));
    }
    if let Some(error) = &status.error {
        println!("Error:      {error}");
    }
    println!("Usable:     {}", if status.valid { "yes" } else { "no" });
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
