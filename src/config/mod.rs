//! Launcher configuration.
//!
//! Settings are read from a TOML file (see [`user::user_config_path`]) and
//! held in a [`SettingsStore`] so the file watcher can swap in new values
//! while resolvers read the current ones.

pub mod settings;
pub mod user;
pub mod watcher;

pub use settings::{
    BundledSettings, CacheSettings, JavaSettings, LauncherSettings, LspSettings,
    RegistrySettings, SettingKey, UpdateSettings, expand_path,
};
pub use user::user_config_path;
pub use watcher::ConfigWatcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

/// Error types for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid launcher TOML.
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Parse settings from TOML text.
pub fn parse_settings(contents: &str, origin: &Path) -> Result<LauncherSettings, ConfigError> {
    toml::from_str::<LauncherSettings>(contents)
        .map(LauncherSettings::normalized)
        .map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
}

/// Load settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<LauncherSettings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_settings(&contents, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!(
                target: "pkl_lsp_launcher::config",
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(LauncherSettings::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Live settings shared between the watcher and the resolvers.
pub struct SettingsStore {
    settings: ArcSwap<LauncherSettings>,
    /// File the settings were loaded from, shown in corrective actions.
    origin: Option<PathBuf>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("settings", &"ArcSwap<LauncherSettings>")
            .field("origin", &self.origin)
            .finish()
    }
}

impl SettingsStore {
    pub fn new(settings: LauncherSettings, origin: Option<PathBuf>) -> Self {
        Self {
            settings: ArcSwap::new(Arc::new(settings)),
            origin,
        }
    }

    /// Snapshot of the current settings.
    pub fn load(&self) -> Arc<LauncherSettings> {
        self.settings.load_full()
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Replace the settings, returning the keys whose values changed.
    pub fn apply(&self, settings: LauncherSettings) -> Vec<SettingKey> {
        let previous = self.settings.swap(Arc::new(settings));
        previous.changed_keys(&self.settings.load())
    }
}
