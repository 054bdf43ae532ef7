use std::sync::Arc;

use log::{debug, info};

use super::{
    JavaRuntime, LOG_TARGET, RuntimeError, SystemEnv, locate_from_system, resolve_configured,
};
use crate::config::{LauncherSettings, SettingKey};
use crate::host::{Host, Notice};
use crate::sync::{SettledReader, SettledWriter, settled};

/// Read side of the current Java runtime.
pub type RuntimeHandle = SettledReader<JavaRuntime>;

/// Resolves the Java runtime and owns the only writer of its cell.
pub struct RuntimeLocator {
    writer: SettledWriter<JavaRuntime>,
    env: SystemEnv,
}

impl RuntimeLocator {
    pub fn new(env: SystemEnv) -> Self {
        let (writer, _) = settled();
        Self { writer, env }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.writer.reader()
    }

    pub fn current(&self) -> Option<Arc<JavaRuntime>> {
        self.writer.current()
    }

    /// Initial resolution: the configured path if set, else the system search.
    ///
    /// On failure the user is notified and the cell stays as it was.
    pub async fn resolve(
        &self,
        settings: &LauncherSettings,
        host: &dyn Host,
    ) -> Result<Arc<JavaRuntime>, RuntimeError> {
        let result = match &settings.java.path {
            Some(path) => resolve_configured(path).await,
            None => locate_from_system(&self.env).await,
        };
        self.settle(result, host)
    }

    /// Re-resolve after `java.path` changed.
    ///
    /// Only a newly set path is acted on; clearing it keeps the current
    /// runtime until the launcher restarts.
    pub async fn reconfigure(
        &self,
        settings: &LauncherSettings,
        host: &dyn Host,
    ) -> Option<Result<Arc<JavaRuntime>, RuntimeError>> {
        let Some(path) = &settings.java.path else {
            debug!(
                target: LOG_TARGET,
                "{} cleared; keeping the current runtime",
                SettingKey::JavaPath
            );
            return None;
        };
        Some(self.settle(resolve_configured(path).await, host))
    }

    fn settle(
        &self,
        result: Result<JavaRuntime, RuntimeError>,
        host: &dyn Host,
    ) -> Result<Arc<JavaRuntime>, RuntimeError> {
        match result {
            Ok(runtime) => {
                info!(
                    target: LOG_TARGET,
                    "Java runtime: {} (version {})",
                    runtime.path.display(),
                    runtime.version
                );
                Ok(self.writer.publish(runtime))
            }
            Err(e) => {
                host.notify(Notice::warning(e.to_string()).with_setting(SettingKey::JavaPath));
                Err(e)
            }
        }
    }
}
