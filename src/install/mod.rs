//! Installation module for pkl-lsp distributions.
//!
//! This module provides the checksum-verified artifact downloader, the Maven
//! registry client, and a small cache for registry metadata.

pub mod cache;
pub mod fetch;
pub mod maven;

use std::path::PathBuf;

/// User agent sent with every registry request.
pub const USER_AGENT: &str = concat!("pkl-lsp-launcher/", env!("CARGO_PKG_VERSION"));

/// Get the default data directory for pkl-lsp-launcher.
///
/// Uses XDG Base Directory specification when available:
/// 1. If `XDG_DATA_HOME` environment variable is set, uses `$XDG_DATA_HOME/pkl-lsp-launcher/`
/// 2. Otherwise, falls back to the platform data directory
///
/// The registry metadata cache lives here. Downloaded distributions do not;
/// they go to [`crate::distribution::default_distributions_dir`], which is
/// shared with other Pkl editor integrations.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME")
        && !xdg_data_home.is_empty()
    {
        return Some(PathBuf::from(xdg_data_home).join("pkl-lsp-launcher"));
    }

    dirs::data_dir().map(|p| p.join("pkl-lsp-launcher"))
}

/// Build the HTTP client used for registry queries and downloads.
///
/// No request timeout is set: a stalled transfer stalls only the task that
/// issued it, and the update check never blocks the server launch.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}
