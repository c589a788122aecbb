//! Path utilities.

use std::path::{Path, PathBuf};

/// Name of the token cache directory under the user's home.
pub const TOKEN_DIR_NAME: &str = ".me_tokens";

/// File name of the token cache inside [`TOKEN_DIR_NAME`].
pub const TOKEN_FILE_NAME: &str = "token_cache.json";

/// Get the token cache directory (`~/.me_tokens`).
///
/// Kept under the home directory so that tokens never end up inside a
/// project checkout.
pub fn token_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(TOKEN_DIR_NAME))
}

/// Get the default token cache file (`~/.me_tokens/token_cache.json`).
pub fn token_cache_file() -> Option<PathBuf> {
    token_dir().map(|p| p.join(TOKEN_FILE_NAME))
}

/// Get the metoken configuration directory.
///
/// Follows the platform config directory from `dirs::config_dir`:
/// - Linux: `$XDG_CONFIG_HOME/metoken`, or `~/.config/metoken`
/// - macOS: `~/Library/Application Support/metoken`
/// - Windows: `%APPDATA%\metoken`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("metoken"))
}

/// Get the global configuration file.
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

/// Expand a leading `~/` to the user's home directory.
///
/// Paths without the prefix, and paths when no home directory is known,
/// are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
