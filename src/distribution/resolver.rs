use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use super::{
    DistributionCache, DistributionError, DistributionSource, LOG_TARGET, ServerDistribution,
    bundled_distribution, default_distributions_dir, probe_server_version,
};
use crate::config::{LauncherSettings, SettingKey};
use crate::host::{Host, Notice};
use crate::runtime::RuntimeHandle;
use crate::sync::{SettledReader, SettledWriter, settled};

/// Read side of the current server distribution.
pub type DistributionHandle = SettledReader<ServerDistribution>;

/// Pick the distribution to run.
///
/// A configured distribution always wins. Otherwise a downloaded one is used
/// only when strictly newer than the bundled one.
pub fn select(
    configured: Option<ServerDistribution>,
    downloaded: Option<ServerDistribution>,
    bundled: ServerDistribution,
) -> ServerDistribution {
    if let Some(configured) = configured {
        return configured;
    }
    match downloaded {
        Some(downloaded) if downloaded.version > bundled.version => downloaded,
        _ => bundled,
    }
}

/// Resolves the server distribution and owns the only writer of its cell.
pub struct DistributionResolver {
    writer: SettledWriter<ServerDistribution>,
    bundled: ServerDistribution,
    cache: Option<DistributionCache>,
}

impl DistributionResolver {
    pub fn new(bundled: ServerDistribution, cache: Option<DistributionCache>) -> Self {
        let (writer, _) = settled();
        Self {
            writer,
            bundled,
            cache,
        }
    }

    /// Resolver for the bundled jar and cache described by `settings`.
    pub fn from_settings(settings: &LauncherSettings) -> Result<Self, DistributionError> {
        let cache = settings
            .cache
            .dir
            .clone()
            .or_else(default_distributions_dir)
            .map(DistributionCache::new);
        Ok(Self::new(bundled_distribution(settings)?, cache))
    }

    pub fn handle(&self) -> DistributionHandle {
        self.writer.reader()
    }

    pub fn current(&self) -> Option<Arc<ServerDistribution>> {
        self.writer.current()
    }

    pub fn bundled(&self) -> &ServerDistribution {
        &self.bundled
    }

    pub fn cache(&self) -> Option<&DistributionCache> {
        self.cache.as_ref()
    }

    /// Initial resolution.
    ///
    /// A configured jar that cannot be probed is reported and nothing is
    /// published: the user asked for that jar, so no other one is run.
    pub async fn resolve(
        &self,
        settings: &LauncherSettings,
        runtime: &RuntimeHandle,
        host: &dyn Host,
    ) -> Result<Arc<ServerDistribution>, DistributionError> {
        let configured = match &settings.lsp.path {
            Some(path) => Some(self.probe_configured(path, runtime, host).await?),
            None => None,
        };
        let downloaded = match (&configured, &self.cache) {
            (None, Some(cache)) => cache.best_compatible(&self.bundled.version),
            _ => None,
        };

        let selected = select(configured, downloaded, self.bundled.clone());
        match selected.source {
            DistributionSource::Configured => info!(
                target: LOG_TARGET,
                "Using pkl-lsp {} from configured {}",
                selected.version,
                SettingKey::LspPath
            ),
            DistributionSource::Downloaded => info!(
                target: LOG_TARGET,
                "Using downloaded pkl-lsp {} at {}",
                selected.version,
                selected.path.display()
            ),
            DistributionSource::Bundled => info!(
                target: LOG_TARGET,
                "Using bundled pkl-lsp {}",
                selected.version
            ),
        }
        Ok(self.writer.publish(selected))
    }

    /// Re-resolve after `lsp.path` changed. Only a newly set path is acted on.
    pub async fn reconfigure(
        &self,
        settings: &LauncherSettings,
        runtime: &RuntimeHandle,
        host: &dyn Host,
    ) -> Option<Result<Arc<ServerDistribution>, DistributionError>> {
        let Some(path) = &settings.lsp.path else {
            debug!(
                target: LOG_TARGET,
                "{} cleared; keeping the current distribution",
                SettingKey::LspPath
            );
            return None;
        };
        let result = self
            .probe_configured(path, runtime, host)
            .await
            .map(|distribution| {
                info!(
                    target: LOG_TARGET,
                    "Using pkl-lsp {} from configured {}",
                    distribution.version,
                    SettingKey::LspPath
                );
                self.writer.publish(distribution)
            });
        Some(result)
    }

    async fn probe_configured(
        &self,
        path: &Path,
        runtime: &RuntimeHandle,
        host: &dyn Host,
    ) -> Result<ServerDistribution, DistributionError> {
        let Some(java) = runtime.wait().await else {
            let err = DistributionError::RuntimeUnavailable;
            host.notify(Notice::error(err.to_string()).with_setting(SettingKey::JavaPath));
            return Err(err);
        };

        let Some(version) = probe_server_version(&java.path, path).await else {
            let err = DistributionError::InvalidConfiguredPath {
                path: path.to_path_buf(),
            };
            host.notify(Notice::warning(err.to_string()).with_setting(SettingKey::LspPath));
            return Err(err);
        };

        // A newer major is allowed, with a warning.
        if !version.is_compatible_with(&self.bundled.version) {
            host.notify(Notice::warning(format!(
                "This version of pkl-lsp-launcher is not compatible with pkl-lsp version {}. Features are not guaranteed to work.",
                version
            )));
        }

        Ok(ServerDistribution {
            path: path.to_path_buf(),
            version,
            source: DistributionSource::Configured,
        })
    }
}
