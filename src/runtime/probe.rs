//! Java executable probing.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use log::{trace, warn};
use tokio::process::Command;

use super::{JavaRuntime, LOG_TARGET};

/// Run `<path> -version` and read the major version from its stderr.
///
/// Returns `None` if `path` is not a regular file, cannot be executed, exits
/// unsuccessfully or prints something without a quoted version.
pub async fn probe_java(path: &Path) -> Option<JavaRuntime> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            trace!(target: LOG_TARGET, "{} is not a file", path.display());
            return None;
        }
        Err(e) => {
            log_probe_error(path, &e);
            return None;
        }
    }

    let output = match Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log_probe_error(path, &e);
            return None;
        }
    };

    if !output.status.success() {
        warn!(
            target: LOG_TARGET,
            "{} -version exited with {}",
            path.display(),
            output.status
        );
        return None;
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let Some(version) = parse_java_version(&stderr) else {
        warn!(
            target: LOG_TARGET,
            "Unexpected version string from {}: {}",
            path.display(),
            stderr.trim()
        );
        return None;
    };

    Some(JavaRuntime {
        path: path.to_path_buf(),
        version,
    })
}

/// Major version from `java -version` output.
///
/// The version is the first double-quoted token; the major is the part
/// before its first `.`. Legacy `1.x` versions therefore report `1`.
pub fn parse_java_version(output: &str) -> Option<u32> {
    let quoted = output.split('"').nth(1)?;
    let major = quoted.split('.').next()?;
    // Early-access builds print e.g. "23-ea".
    let digits: &str = major
        .find(|c: char| !c.is_ascii_digit())
        .map_or(major, |end| &major[..end]);
    digits.parse().ok()
}

fn log_probe_error(path: &Path, err: &std::io::Error) {
    if err.kind() == ErrorKind::NotFound {
        trace!(target: LOG_TARGET, "No java at {}", path.display());
    } else {
        warn!(
            target: LOG_TARGET,
            "Received unexpected error when spawning {}: {}",
            path.display(),
            err
        );
    }
}
