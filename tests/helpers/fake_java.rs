//! Shell-script stand-ins for `java` and pkl-lsp jars.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Write an executable `java` into `dir` that reports `version`.
///
/// `-version` prints `openjdk version "<version>"` to stderr. `-jar <file>`
/// prints the file, so jars made by [`write_jar`] answer `--version`.
pub fn install(dir: &Path, version: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("java");
    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo 'openjdk version "{version}" 2024-04-16' >&2
    exit 0
fi
if [ "$1" = "-jar" ]; then
    cat "$2"
    exit $?
fi
exit 1
"#
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Write a "jar" that the fake `java` reports as pkl-lsp `version`.
pub fn write_jar(path: &Path, version: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, format!("pkl-lsp version {}\n", version)).unwrap();
}
