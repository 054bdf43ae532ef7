use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::semver::Semver;

/// Launcher configuration as read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub java: JavaSettings,
    pub lsp: LspSettings,
    pub bundled: BundledSettings,
    pub update: UpdateSettings,
    pub registry: RegistrySettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaSettings {
    /// Explicit Java executable. Disables `$JAVA_HOME`/`$PATH` search.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LspSettings {
    /// Explicit pkl-lsp jar. Takes precedence over downloaded and bundled jars.
    pub path: Option<PathBuf>,
    /// Connect to an already running server on this port instead of spawning one.
    pub socket_port: Option<u16>,
    pub socket_host: Option<String>,
    /// Start the server with a JDWP agent listening on this port.
    pub debug_port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundledSettings {
    /// Jar shipped alongside the launcher.
    pub path: Option<PathBuf>,
    /// Version of that jar; the compatibility reference for every other candidate.
    pub version: Option<Semver>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    /// Ask the registry for a newer compatible server on launch.
    pub check: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self { check: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding downloaded `<version>/pkl-lsp-<version>.jar` distributions.
    pub dir: Option<PathBuf>,
}

/// Stable names for individual settings, as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    JavaPath,
    LspPath,
    LspSocketPort,
    LspSocketHost,
    LspDebugPort,
    BundledPath,
    BundledVersion,
    UpdateCheck,
    RegistryUrl,
    CacheDir,
}

impl SettingKey {
    pub const ALL: [SettingKey; 10] = [
        SettingKey::JavaPath,
        SettingKey::LspPath,
        SettingKey::LspSocketPort,
        SettingKey::LspSocketHost,
        SettingKey::LspDebugPort,
        SettingKey::BundledPath,
        SettingKey::BundledVersion,
        SettingKey::UpdateCheck,
        SettingKey::RegistryUrl,
        SettingKey::CacheDir,
    ];

    /// Editor-facing identifier, shared with other Pkl integrations.
    pub fn id(self) -> &'static str {
        match self {
            SettingKey::JavaPath => "pkl.lsp.java.path",
            SettingKey::LspPath => "pkl.lsp.path",
            SettingKey::LspSocketPort => "pkl.lsp.socket.port",
            SettingKey::LspSocketHost => "pkl.lsp.socket.host",
            SettingKey::LspDebugPort => "pkl.lsp.debug.port",
            SettingKey::BundledPath => "pkl.lsp.bundled.path",
            SettingKey::BundledVersion => "pkl.lsp.bundled.version",
            SettingKey::UpdateCheck => "pkl.lsp.update.check",
            SettingKey::RegistryUrl => "pkl.lsp.registry.url",
            SettingKey::CacheDir => "pkl.lsp.cache.dir",
        }
    }

    /// Location of the setting inside `config.toml`.
    pub fn toml_path(self) -> &'static str {
        match self {
            SettingKey::JavaPath => "java.path",
            SettingKey::LspPath => "lsp.path",
            SettingKey::LspSocketPort => "lsp.socket_port",
            SettingKey::LspSocketHost => "lsp.socket_host",
            SettingKey::LspDebugPort => "lsp.debug_port",
            SettingKey::BundledPath => "bundled.path",
            SettingKey::BundledVersion => "bundled.version",
            SettingKey::UpdateCheck => "update.check",
            SettingKey::RegistryUrl => "registry.url",
            SettingKey::CacheDir => "cache.dir",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl LauncherSettings {
    /// Expand `~/` and normalise every configured path.
    pub fn normalized(mut self) -> Self {
        for path in [
            &mut self.java.path,
            &mut self.lsp.path,
            &mut self.bundled.path,
            &mut self.cache.dir,
        ]
        .into_iter()
        .flatten()
        {
            *path = expand_path(path);
        }
        self
    }

    /// Keys whose values differ between `self` and `other`.
    pub fn changed_keys(&self, other: &LauncherSettings) -> Vec<SettingKey> {
        SettingKey::ALL
            .into_iter()
            .filter(|key| !self.same_value(other, *key))
            .collect()
    }

    fn same_value(&self, other: &LauncherSettings, key: SettingKey) -> bool {
        match key {
            SettingKey::JavaPath => self.java.path == other.java.path,
            SettingKey::LspPath => self.lsp.path == other.lsp.path,
            SettingKey::LspSocketPort => self.lsp.socket_port == other.lsp.socket_port,
            SettingKey::LspSocketHost => self.lsp.socket_host == other.lsp.socket_host,
            SettingKey::LspDebugPort => self.lsp.debug_port == other.lsp.debug_port,
            SettingKey::BundledPath => self.bundled.path == other.bundled.path,
            // Semver equality ignores pre-release tags; compare rendered form.
            SettingKey::BundledVersion => {
                self.bundled.version.as_ref().map(ToString::to_string)
                    == other.bundled.version.as_ref().map(ToString::to_string)
            }
            SettingKey::UpdateCheck => self.update.check == other.update.check,
            SettingKey::RegistryUrl => self.registry.url == other.registry.url,
            SettingKey::CacheDir => self.cache.dir == other.cache.dir,
        }
    }
}

/// Expand a leading `~` to the home directory and clean `.`/`..` segments.
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    path_clean::clean(expanded)
}
