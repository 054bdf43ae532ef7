//! Polling watcher for the configuration file.
//!
//! The file is checked once per interval; a change in modification time (or
//! the file appearing or disappearing) reloads it and hands the result to the
//! caller. Parse errors are passed through so the caller can surface them
//! without dropping the last good settings.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::debug;
use tokio_util::sync::CancellationToken;

use super::{ConfigError, LauncherSettings, load_settings};

/// Default interval between modification-time checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const LOG_TARGET: &str = "pkl_lsp_launcher::config::watcher";

/// Watches a single configuration file for changes.
#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll until `cancel_token` fires, calling `on_change` with every reload.
    pub async fn run<F>(self, cancel_token: CancellationToken, mut on_change: F)
    where
        F: FnMut(Result<LauncherSettings, ConfigError>),
    {
        let mut last_seen = modified_time(&self.path).await;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!(target: LOG_TARGET, "Config watcher cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    let current = modified_time(&self.path).await;
                    if current == last_seen {
                        continue;
                    }
                    last_seen = current;
                    debug!(
                        target: LOG_TARGET,
                        "{} changed, reloading",
                        self.path.display()
                    );
                    on_change(load_settings(&self.path));
                }
            }
        }
    }
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[tokio::test]
    async fn reports_modified_file_and_stops_on_cancel() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[lsp]\ndebug_port = 1\n").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(1_000_000, 0)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = CancellationToken::new();
        let watcher = ConfigWatcher::new(&path).with_interval(Duration::from_millis(20));
        let task = tokio::spawn(watcher.run(token.clone(), move |result| {
            sink.lock().unwrap().push(result.map(|s| s.lsp.debug_port));
        }));

        tokio::time::sleep(Duration::from_millis(60)).await;
        let staged = temp.path().join("config.toml.new");
        std::fs::write(&staged, "[lsp]\ndebug_port = 5005\n").unwrap();
        set_file_mtime(&staged, FileTime::from_unix_time(2_000_000, 0)).unwrap();
        std::fs::rename(&staged, &path).unwrap();

        for _ in 0..100 {
            if !seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        token.cancel();
        task.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_ref().ok(), Some(&Some(5005)));
    }

    #[tokio::test]
    async fn parse_errors_are_forwarded() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let token = CancellationToken::new();
        let watcher = ConfigWatcher::new(&path).with_interval(Duration::from_millis(20));
        let task = tokio::spawn(watcher.run(token.clone(), move |result| {
            sink.lock().unwrap().push(result.is_err());
        }));

        tokio::time::sleep(Duration::from_millis(60)).await;
        let staged = temp.path().join("config.toml.new");
        std::fs::write(&staged, "[lsp\n").unwrap();
        std::fs::rename(&staged, &path).unwrap();

        for _ in 0..100 {
            if !seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        token.cancel();
        task.await.unwrap();

        assert_eq!(seen.lock().unwrap().first(), Some(&true));
    }
}
