//! User configuration location for pkl-lsp-launcher.
//!
//! User config location: $XDG_CONFIG_HOME/pkl-lsp-launcher/config.toml
//! Fallback: the platform config directory (e.g. ~/.config on Linux)

use std::path::PathBuf;

const APP_DIR: &str = "pkl-lsp-launcher";
const CONFIG_FILE: &str = "config.toml";

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/pkl-lsp-launcher/config.toml
/// 2. Otherwise: `dirs::config_dir()`/pkl-lsp-launcher/config.toml
///
/// Returns None if neither can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Some(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE));
    }

    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
