//! Background check for newer pkl-lsp releases.
//!
//! ```text
//! latest version ──► compatible with bundled? ──no──► Incompatible
//!                          │ yes
//!                          ▼
//!                    already in cache? ──yes──► AlreadyDownloaded
//!                          │ no
//!                          ▼
//!                    bundled >= latest? ──yes──► UpToDate
//!                          │ no
//!                          ▼
//!                    ask the user ──no──► Declined
//!                          │ yes
//!                          ▼
//!                    download, request restart ──► Downloaded
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};

use crate::config::LauncherSettings;
use crate::distribution::{
    BUNDLED_LSP_VERSION, DistributionCache, DistributionSource, ServerDistribution,
    default_distributions_dir,
};
use crate::error::{LauncherError, LauncherResult};
use crate::host::Host;
use crate::install::cache::MetadataCache;
use crate::install::maven::{Coordinate, DEFAULT_REGISTRY_URL, FetchOptions, MavenClient, RegistryError};
use crate::install::{default_data_dir, http_client};
use crate::semver::Semver;

const LOG_TARGET: &str = "pkl_lsp_launcher::update";

/// Label of the affirmative answer to the download prompt.
pub const DOWNLOAD_ACTION: &str = "Download and restart";

/// Everything the update checker needs.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    pub registry: MavenClient,
    pub coordinate: Coordinate,
    pub cache: DistributionCache,
    /// Compatibility reference.
    pub bundled_version: Semver,
    pub fetch_options: FetchOptions,
}

impl UpdateContext {
    /// Context for the registry, cache and bundled version in `settings`.
    pub fn from_settings(settings: &LauncherSettings) -> LauncherResult<Self> {
        let registry_url = settings
            .registry
            .url
            .as_deref()
            .unwrap_or(DEFAULT_REGISTRY_URL);
        let mut registry = MavenClient::new(registry_url, http_client()?)?;
        if let Some(data_dir) = default_data_dir() {
            registry = registry.with_metadata_cache(MetadataCache::with_default_ttl(&data_dir));
        }

        let cache_root = settings
            .cache
            .dir
            .clone()
            .or_else(default_distributions_dir)
            .ok_or_else(|| {
                LauncherError::internal("Cannot determine the home directory for the download cache")
            })?;

        Ok(Self {
            registry,
            coordinate: Coordinate::pkl_lsp(),
            cache: DistributionCache::new(cache_root),
            bundled_version: settings
                .bundled
                .version
                .clone()
                .unwrap_or(BUNDLED_LSP_VERSION),
            fetch_options: FetchOptions::default(),
        })
    }

    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    async fn latest_version(&self) -> Result<Semver, RegistryError> {
        self.registry
            .latest_version_with_options(&self.coordinate, self.fetch_options)
            .await
    }
}

/// What the update check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The latest release cannot be used with this launcher.
    Incompatible { latest: Semver },
    AlreadyDownloaded { latest: Semver },
    /// The bundled server is at least as new as the latest release.
    UpToDate { latest: Semver },
    Declined { latest: Semver },
    Downloaded { version: Semver, path: PathBuf },
    /// Something went wrong; the message has already been logged.
    Failed(String),
}

/// Look for a newer compatible server and offer to download it.
///
/// Never fails: errors are logged and reported as [`UpdateOutcome::Failed`].
pub async fn check_for_update(ctx: &UpdateContext, host: Arc<dyn Host>) -> UpdateOutcome {
    match run_check(ctx, host).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                target: LOG_TARGET,
                "Failed to check for the latest pkl-lsp: {}",
                e
            );
            UpdateOutcome::Failed(e.to_string())
        }
    }
}

async fn run_check(ctx: &UpdateContext, host: Arc<dyn Host>) -> LauncherResult<UpdateOutcome> {
    let latest = ctx.latest_version().await?;

    if !latest.is_compatible_with(&ctx.bundled_version) {
        info!(
            target: LOG_TARGET,
            "Latest pkl-lsp is {}, which is not compatible with {}",
            latest,
            ctx.bundled_version
        );
        return Ok(UpdateOutcome::Incompatible { latest });
    }

    if ctx.cache.contains(&latest) {
        info!(
            target: LOG_TARGET,
            "Latest pkl-lsp is {}, and it is already downloaded",
            latest
        );
        return Ok(UpdateOutcome::AlreadyDownloaded { latest });
    }

    if ctx.bundled_version >= latest {
        info!(
            target: LOG_TARGET,
            "Latest pkl-lsp is {}, which is not newer than the bundled {}",
            latest,
            ctx.bundled_version
        );
        return Ok(UpdateOutcome::UpToDate { latest });
    }

    let message = format!("A new version of pkl-lsp ({}) is available.", latest);
    let prompt_host = Arc::clone(&host);
    let accepted = tokio::task::spawn_blocking(move || prompt_host.prompt(&message, DOWNLOAD_ACTION))
        .await
        .map_err(|e| LauncherError::internal(format!("Prompt task failed: {}", e)))?;
    if !accepted {
        info!(target: LOG_TARGET, "Download of pkl-lsp {} declined", latest);
        return Ok(UpdateOutcome::Declined { latest });
    }

    let path = ctx.cache.jar_path(&latest);
    ctx.registry
        .download_artifact(&ctx.coordinate, &latest, &path)
        .await?;
    info!(
        target: LOG_TARGET,
        "Downloaded pkl-lsp {} to {}",
        latest,
        path.display()
    );
    host.request_restart(&format!("pkl-lsp {} was downloaded", latest));

    Ok(UpdateOutcome::Downloaded {
        version: latest,
        path,
    })
}

/// Download `version` (or the latest release) into the cache.
///
/// Unlike [`check_for_update`] this is user-initiated, so errors propagate.
pub async fn download_server(
    ctx: &UpdateContext,
    version: Option<Semver>,
) -> LauncherResult<ServerDistribution> {
    let version = match version {
        Some(version) => version,
        None => ctx.latest_version().await?,
    };

    if !version.is_compatible_with(&ctx.bundled_version) {
        warn!(
            target: LOG_TARGET,
            "pkl-lsp {} is not compatible with {}; it will only be used if configured explicitly",
            version,
            ctx.bundled_version
        );
    }

    let path = ctx.cache.jar_path(&version);
    if ctx.cache.contains(&version) {
        info!(
            target: LOG_TARGET,
            "pkl-lsp {} is already downloaded at {}",
            version,
            path.display()
        );
    } else {
        ctx.registry
            .download_artifact(&ctx.coordinate, &version, &path)
            .await?;
    }

    Ok(ServerDistribution {
        path,
        version,
        source: DistributionSource::Downloaded,
    })
}
