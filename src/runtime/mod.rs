//! Java runtime discovery.
//!
//! The Pkl language server needs Java 22 or newer. A configured executable is
//! used as-is (and rejected loudly if unusable); otherwise `$JAVA_HOME/bin`
//! and then each `$PATH` entry are searched for the first qualifying `java`.

pub mod locator;
pub mod probe;

pub use locator::{RuntimeHandle, RuntimeLocator};
pub use probe::{parse_java_version, probe_java};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Oldest Java release the language server runs on.
pub const MINIMUM_JAVA_VERSION: u32 = 22;

pub(crate) const LOG_TARGET: &str = "pkl_lsp_launcher::runtime";

/// A probed Java executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JavaRuntime {
    pub path: PathBuf,
    /// Major version only.
    pub version: u32,
}

/// Error types for runtime resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(
        "Cannot find suitable Java in $PATH or $JAVA_HOME. pkl-lsp requires Java {minimum} or higher."
    )]
    NotFound { minimum: u32 },

    #[error(
        "Could not resolve Java version information from {}. Ensure it is the path to the Java executable.",
        path.display()
    )]
    InvalidConfiguredPath { path: PathBuf },

    #[error(
        "pkl-lsp requires Java {minimum} or higher, but was configured to use version {version} ({})",
        path.display()
    )]
    ConfiguredVersionTooLow {
        path: PathBuf,
        version: u32,
        minimum: u32,
    },
}

/// The parts of the process environment used for the system search.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv {
    pub java_home: Option<PathBuf>,
    pub path: Option<OsString>,
    pub path_ext: Option<OsString>,
}

impl SystemEnv {
    /// Capture `JAVA_HOME`, `PATH` and `PATHEXT`.
    pub fn from_env() -> Self {
        Self {
            java_home: std::env::var_os("JAVA_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            path: std::env::var_os("PATH"),
            path_ext: std::env::var_os("PATHEXT"),
        }
    }

    /// File names a Java executable may have: `java` plus each `PATHEXT` suffix.
    pub fn executable_names(&self) -> Vec<OsString> {
        let Some(path_ext) = &self.path_ext else {
            return vec![OsString::from("java")];
        };
        let mut names: Vec<OsString> = Vec::new();
        for ext in std::env::split_paths(path_ext) {
            let mut name = OsString::from("java");
            name.push(ext.as_os_str());
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if names.is_empty() {
            names.push(OsString::from("java"));
        }
        names
    }

    /// Probe each executable name in `dir`, returning the first that answers.
    pub async fn find_java_in_dir(&self, dir: &Path) -> Option<JavaRuntime> {
        for name in self.executable_names() {
            if let Some(runtime) = probe_java(&dir.join(name)).await {
                return Some(runtime);
            }
        }
        None
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        self.path
            .as_ref()
            .map(|path| {
                std::env::split_paths(path)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Search `$JAVA_HOME/bin`, then `$PATH`, for Java 22+.
///
/// Runtimes below the minimum are skipped, not returned: a qualifying
/// runtime later in `$PATH` wins over an older one earlier.
pub async fn locate_from_system(env: &SystemEnv) -> Result<JavaRuntime, RuntimeError> {
    if let Some(java_home) = &env.java_home {
        let bin = java_home.join("bin");
        match env.find_java_in_dir(&bin).await {
            Some(runtime) if runtime.version >= MINIMUM_JAVA_VERSION => {
                log::info!(
                    target: LOG_TARGET,
                    "Using Java {} from $JAVA_HOME ({})",
                    runtime.version,
                    runtime.path.display()
                );
                return Ok(runtime);
            }
            Some(runtime) => log::debug!(
                target: LOG_TARGET,
                "Skipping $JAVA_HOME Java {} at {}: below {}",
                runtime.version,
                runtime.path.display(),
                MINIMUM_JAVA_VERSION
            ),
            None => {}
        }
    }

    for dir in env.search_dirs() {
        match env.find_java_in_dir(&dir).await {
            Some(runtime) if runtime.version >= MINIMUM_JAVA_VERSION => {
                log::info!(
                    target: LOG_TARGET,
                    "Using Java {} from $PATH ({})",
                    runtime.version,
                    runtime.path.display()
                );
                return Ok(runtime);
            }
            Some(runtime) => log::debug!(
                target: LOG_TARGET,
                "Skipping Java {} at {}: below {}",
                runtime.version,
                runtime.path.display(),
                MINIMUM_JAVA_VERSION
            ),
            None => {}
        }
    }

    Err(RuntimeError::NotFound {
        minimum: MINIMUM_JAVA_VERSION,
    })
}

/// Probe exactly `path`. Never falls back to the system search.
pub async fn resolve_configured(path: &Path) -> Result<JavaRuntime, RuntimeError> {
    let runtime = probe_java(path)
        .await
        .ok_or_else(|| RuntimeError::InvalidConfiguredPath {
            path: path.to_path_buf(),
        })?;
    if runtime.version < MINIMUM_JAVA_VERSION {
        return Err(RuntimeError::ConfiguredVersionTooLow {
            path: runtime.path,
            version: runtime.version,
            minimum: MINIMUM_JAVA_VERSION,
        });
    }
    Ok(runtime)
}
