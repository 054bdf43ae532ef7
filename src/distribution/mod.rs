//! pkl-lsp server distributions.
//!
//! A distribution is a server jar with a known version. Three sources are
//! considered, in order of precedence:
//!
//! 1. `lsp.path` from the configuration, used even if its version is older;
//! 2. the newest compatible jar in the download cache, if it is strictly newer
//!    than the bundled one;
//! 3. the bundled jar shipped with the launcher.

pub mod cache;
pub mod resolver;

pub use cache::DistributionCache;
pub use resolver::{DistributionHandle, DistributionResolver, select};

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;

use crate::config::LauncherSettings;
use crate::semver::Semver;

/// Version of the server jar shipped with the launcher.
///
/// Every other candidate must be compatible with this version.
pub const BUNDLED_LSP_VERSION: Semver = Semver::new(0, 6, 0);

/// File name of the bundled jar when it sits next to the executable.
pub const BUNDLED_JAR_NAME: &str = "pkl-lsp.jar";

pub(crate) const LOG_TARGET: &str = "pkl_lsp_launcher::distribution";

/// Where a distribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionSource {
    Configured,
    Downloaded,
    Bundled,
}

impl std::fmt::Display for DistributionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DistributionSource::Configured => "configured",
            DistributionSource::Downloaded => "downloaded",
            DistributionSource::Bundled => "bundled",
        })
    }
}

/// A server jar and its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerDistribution {
    pub path: PathBuf,
    pub version: Semver,
    pub source: DistributionSource,
}

/// Error types for distribution resolution.
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("Configured path {} is not a valid lsp jar.", path.display())]
    InvalidConfiguredPath { path: PathBuf },

    /// The runtime resolver went away before producing a runtime.
    #[error("No Java runtime is available to probe the server jar")]
    RuntimeUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `~/.pkl/editor-support/lsp-distributions`, shared with other Pkl editor integrations.
pub fn default_distributions_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pkl/editor-support/lsp-distributions"))
}

/// The bundled distribution described by `settings`.
///
/// Without `bundled.path` the jar is expected next to the launcher executable.
pub fn bundled_distribution(
    settings: &LauncherSettings,
) -> Result<ServerDistribution, DistributionError> {
    let path = match &settings.bundled.path {
        Some(path) => path.clone(),
        None => {
            let exe = std::env::current_exe()?;
            exe.parent()
                .map(|dir| dir.join(BUNDLED_JAR_NAME))
                .unwrap_or_else(|| PathBuf::from(BUNDLED_JAR_NAME))
        }
    };
    Ok(ServerDistribution {
        path,
        version: settings
            .bundled
            .version
            .clone()
            .unwrap_or(BUNDLED_LSP_VERSION),
        source: DistributionSource::Bundled,
    })
}

/// Ask a server jar for its version with `java -jar <jar> --version`.
pub async fn probe_server_version(java: &Path, jar: &Path) -> Option<Semver> {
    let output = match Command::new(java)
        .arg("-jar")
        .arg(jar)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::warn!(
                target: LOG_TARGET,
                "Failed to run {} -jar {}: {}",
                java.display(),
                jar.display(),
                e
            );
            return None;
        }
    };

    if !output.status.success() {
        log::warn!(
            target: LOG_TARGET,
            "{} --version exited with {}",
            jar.display(),
            output.status
        );
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = parse_server_version(&stdout);
    if version.is_none() {
        log::warn!(
            target: LOG_TARGET,
            "Got malformed version output from jar file at {}: {}. Expected \"pkl-lsp version <version>\"",
            jar.display(),
            stdout.trim_end()
        );
    }
    version
}

/// Version from `pkl-lsp version <version>` output.
pub fn parse_server_version(output: &str) -> Option<Semver> {
    let line = output
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(output);
    let version = line.rsplit(" version ").next()?;
    Semver::parse(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DistributionSource::Configured)]
    #[case(DistributionSource::Downloaded)]
    #[case(DistributionSource::Bundled)]
    fn source_displays_as_serialized(#[case] source: DistributionSource) {
        let json = serde_json::to_string(&source).unwrap();
        assert_eq!(json.trim_matches('"'), source.to_string());
    }

    #[rstest]
    #[case::plain("pkl-lsp version 0.6.0\n", Some("0.6.0"))]
    #[case::crlf("pkl-lsp version 0.7.1\r\n", Some("0.7.1"))]
    #[case::no_newline("pkl-lsp version 1.0.0", Some("1.0.0"))]
    #[case::pre_release("pkl-lsp version 0.6.0-SNAPSHOT\n", Some("0.6.0-SNAPSHOT"))]
    #[case::only_version("0.6.0\n", Some("0.6.0"))]
    #[case::garbage("Error: Unable to access jarfile\n", None)]
    #[case::two_newlines("pkl-lsp version 0.6.0\n\n", None)]
    fn parses_server_version(#[case] output: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            parse_server_version(output).map(|v| v.to_string()),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn bundled_distribution_uses_settings() {
        let mut settings = LauncherSettings::default();
        settings.bundled.path = Some(PathBuf::from("/usr/share/pkl/pkl-lsp.jar"));

        let bundled = bundled_distribution(&settings).unwrap();
        assert_eq!(bundled.path, PathBuf::from("/usr/share/pkl/pkl-lsp.jar"));
        assert_eq!(bundled.version, BUNDLED_LSP_VERSION);
        assert_eq!(bundled.source, DistributionSource::Bundled);

        settings.bundled.version = Semver::parse("0.7.0");
        assert_eq!(
            bundled_distribution(&settings).unwrap().version,
            Semver::new(0, 7, 0)
        );
    }

    #[test]
    fn bundled_jar_defaults_to_executable_dir() {
        let bundled = bundled_distribution(&LauncherSettings::default()).unwrap();
        assert_eq!(
            bundled.path.file_name().and_then(|n| n.to_str()),
            Some(BUNDLED_JAR_NAME)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probes_jar_through_java() {
        let temp = tempfile::tempdir().unwrap();
        let java = crate::runtime::fake_java::install(temp.path(), "22.0.1");
        let jar = temp.path().join("pkl-lsp.jar");
        std::fs::write(&jar, "pkl-lsp version 0.6.3\n").unwrap();

        assert_eq!(
            probe_server_version(&java, &jar).await,
            Some(Semver::new(0, 6, 3))
        );
        assert_eq!(
            probe_server_version(&java, &temp.path().join("missing.jar")).await,
            None
        );
    }
}
