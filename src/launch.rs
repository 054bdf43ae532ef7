//! Starting the language server.
//!
//! ```text
//!   RuntimeLocator ─┐                       ┌─► java [-agentlib:jdwp=...] -jar pkl-lsp.jar
//!                   ├─► join! both handles ─┤      (stdio inherited)
//! DistributionResolver ┘                    └─► restart notice on later changes
//!
//! ConfigWatcher ─► SettingsStore::apply ─► Debouncer(key) ─► reconfigure
//! ```
//!
//! With `lsp.socket_port` set nothing is spawned: stdio is relayed to an
//! already running server instead.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigWatcher, SettingKey, SettingsStore};
use crate::distribution::{DistributionResolver, ServerDistribution};
use crate::error::{LauncherError, LauncherResult};
use crate::host::{Host, Notice};
use crate::runtime::{JavaRuntime, RuntimeLocator, SystemEnv};
use crate::sync::{DEFAULT_DEBOUNCE_WINDOW, Debouncer};
use crate::update::{UpdateContext, UpdateOutcome, check_for_update};

const LOG_TARGET: &str = "pkl_lsp_launcher::launch";

/// Host used for `lsp.socket_port` when `lsp.socket_host` is unset.
pub const DEFAULT_SOCKET_HOST: &str = "localhost";

/// The process that runs the language server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ServerCommand {
    /// `java -jar <jar>`.
    pub fn run(java: &Path, jar: &Path) -> Self {
        Self {
            program: java.to_path_buf(),
            args: vec![OsString::from("-jar"), jar.as_os_str().to_owned()],
        }
    }

    /// `java` with a JDWP agent listening on `port`, and verbose server logging.
    pub fn debug(java: &Path, jar: &Path, port: u16) -> Self {
        Self {
            program: java.to_path_buf(),
            args: vec![
                OsString::from(format!(
                    "-agentlib:jdwp=transport=dt_socket,server=y,suspend=n,quiet=y,address=*:{}",
                    port
                )),
                OsString::from("-jar"),
                jar.as_os_str().to_owned(),
                OsString::from("--verbose"),
            ],
        }
    }

    pub fn for_distribution(
        runtime: &JavaRuntime,
        distribution: &ServerDistribution,
        debug_port: Option<u16>,
    ) -> Self {
        match debug_port {
            Some(port) => Self::debug(&runtime.path, &distribution.path, port),
            None => Self::run(&runtime.path, &distribution.path),
        }
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// Copy `input` to `stream` and `stream` to `output` until either side closes.
pub async fn relay<R, W>(stream: TcpStream, mut input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut from_server, mut to_server) = stream.into_split();
    tokio::select! {
        result = tokio::io::copy(&mut input, &mut to_server) => {
            debug!(target: LOG_TARGET, "Client side of the relay closed");
            result?;
        }
        result = tokio::io::copy(&mut from_server, &mut output) => {
            debug!(target: LOG_TARGET, "Server side of the relay closed");
            result?;
        }
    }
    Ok(())
}

/// Ties resolution, configuration reloads and the server process together.
#[derive(Clone)]
pub struct Launcher {
    settings: Arc<SettingsStore>,
    host: Arc<dyn Host>,
    runtime: Arc<RuntimeLocator>,
    distribution: Arc<DistributionResolver>,
    debouncer: Arc<Debouncer<SettingKey>>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("settings", &self.settings)
            .field("debounce_window", &self.debouncer.window())
            .finish_non_exhaustive()
    }
}

impl Launcher {
    pub fn new(
        settings: Arc<SettingsStore>,
        host: Arc<dyn Host>,
        env: SystemEnv,
    ) -> LauncherResult<Self> {
        let distribution = DistributionResolver::from_settings(&settings.load())?;
        Ok(Self::with_parts(
            settings,
            host,
            RuntimeLocator::new(env),
            distribution,
            DEFAULT_DEBOUNCE_WINDOW,
        ))
    }

    pub fn with_parts(
        settings: Arc<SettingsStore>,
        host: Arc<dyn Host>,
        runtime: RuntimeLocator,
        distribution: DistributionResolver,
        debounce_window: Duration,
    ) -> Self {
        Self {
            settings,
            host,
            runtime: Arc::new(runtime),
            distribution: Arc::new(distribution),
            debouncer: Arc::new(Debouncer::with_window(debounce_window)),
        }
    }

    pub fn runtime(&self) -> &RuntimeLocator {
        &self.runtime
    }

    pub fn distribution(&self) -> &DistributionResolver {
        &self.distribution
    }

    /// Resolve the runtime, then the distribution, reporting the first failure.
    pub async fn resolve_all(
        &self,
    ) -> LauncherResult<(Arc<JavaRuntime>, Arc<ServerDistribution>)> {
        let settings = self.settings.load();
        let runtime = self.runtime.resolve(&settings, self.host.as_ref()).await?;
        let distribution = self
            .distribution
            .resolve(&settings, &self.runtime.handle(), self.host.as_ref())
            .await?;
        Ok((runtime, distribution))
    }

    /// Start both resolvers as independent tasks.
    ///
    /// Failures are reported through the host; the cells stay pending until a
    /// configuration change resolves them.
    pub fn spawn_resolution(&self) {
        let settings = self.settings.load();
        let runtime = Arc::clone(&self.runtime);
        let host = Arc::clone(&self.host);
        let runtime_settings = Arc::clone(&settings);
        tokio::spawn(async move {
            if let Err(e) = runtime.resolve(&runtime_settings, host.as_ref()).await {
                warn!(target: LOG_TARGET, "Java runtime resolution failed: {}", e);
            }
        });

        let distribution = Arc::clone(&self.distribution);
        let runtime_handle = self.runtime.handle();
        let host = Arc::clone(&self.host);
        tokio::spawn(async move {
            if let Err(e) = distribution
                .resolve(&settings, &runtime_handle, host.as_ref())
                .await
            {
                warn!(target: LOG_TARGET, "pkl-lsp resolution failed: {}", e);
            }
        });
    }

    /// React to changed settings.
    ///
    /// Runtime and server paths are re-resolved once their key has been quiet
    /// for the debounce window; other settings apply on the next start.
    pub fn on_settings_changed(&self, keys: &[SettingKey]) {
        for &key in keys {
            match key {
                SettingKey::JavaPath => {
                    let runtime = Arc::clone(&self.runtime);
                    let settings = Arc::clone(&self.settings);
                    let host = Arc::clone(&self.host);
                    self.debouncer.schedule(key, async move {
                        let current = settings.load();
                        if let Some(Err(e)) = runtime.reconfigure(&current, host.as_ref()).await {
                            warn!(target: LOG_TARGET, "Java runtime re-resolution failed: {}", e);
                        }
                    });
                }
                SettingKey::LspPath => {
                    let distribution = Arc::clone(&self.distribution);
                    let runtime_handle = self.runtime.handle();
                    let settings = Arc::clone(&self.settings);
                    let host = Arc::clone(&self.host);
                    self.debouncer.schedule(key, async move {
                        let current = settings.load();
                        if let Some(Err(e)) = distribution
                            .reconfigure(&current, &runtime_handle, host.as_ref())
                            .await
                        {
                            warn!(target: LOG_TARGET, "pkl-lsp re-resolution failed: {}", e);
                        }
                    });
                }
                other => info!(
                    target: LOG_TARGET,
                    "{} changed; it takes effect when the launcher restarts",
                    other
                ),
            }
        }
    }

    /// Poll the configuration file and feed changes into the store.
    pub fn watch_config(&self, path: PathBuf, cancel_token: CancellationToken) -> JoinHandle<()> {
        let launcher = self.clone();
        let watcher = ConfigWatcher::new(path);
        tokio::spawn(watcher.run(cancel_token, move |result| match result {
            Ok(settings) => {
                let changed = launcher.settings.apply(settings);
                launcher.on_settings_changed(&changed);
            }
            Err(e) => launcher.host.notify(Notice::warning(format!(
                "{}. Keeping the previous settings.",
                e
            ))),
        }))
    }

    /// Run the update check in the background if enabled.
    pub fn spawn_update_check(&self) -> Option<JoinHandle<UpdateOutcome>> {
        let settings = self.settings.load();
        if !settings.update.check {
            debug!(target: LOG_TARGET, "Update check disabled");
            return None;
        }
        let ctx = match UpdateContext::from_settings(&settings) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(target: LOG_TARGET, "Skipping update check: {}", e);
                return None;
            }
        };
        let host = Arc::clone(&self.host);
        Some(tokio::spawn(async move { check_for_update(&ctx, host).await }))
    }

    /// Run the server (or the socket relay) until it exits or `cancel_token` fires.
    ///
    /// Returns the exit code to report.
    pub async fn run(&self, cancel_token: CancellationToken) -> LauncherResult<i32> {
        let settings = self.settings.load();
        if let Some(port) = settings.lsp.socket_port {
            let host = settings
                .lsp
                .socket_host
                .clone()
                .unwrap_or_else(|| DEFAULT_SOCKET_HOST.to_string());
            return self.run_relay(&host, port, cancel_token).await;
        }

        self.spawn_resolution();

        let mut runtime_handle = self.runtime.handle();
        let mut distribution_handle = self.distribution.handle();
        let (runtime, distribution) =
            tokio::join!(runtime_handle.wait(), distribution_handle.wait());
        let (Some(runtime), Some(distribution)) = (runtime, distribution) else {
            return Err(LauncherError::internal("resolver stopped before resolving"));
        };
        runtime_handle.mark_seen();
        distribution_handle.mark_seen();

        let command = ServerCommand::for_distribution(&runtime, &distribution, settings.lsp.debug_port);
        info!(
            target: LOG_TARGET,
            "Starting pkl-lsp {}: {} {:?}",
            distribution.version,
            command.program.display(),
            command.args
        );
        let mut child = command.to_command().spawn().map_err(|e| {
            LauncherError::launch(format!("{}: {}", command.program.display(), e))
        })?;

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status?;
                    info!(target: LOG_TARGET, "pkl-lsp exited with {}", status);
                    return Ok(status.code().unwrap_or(1));
                }
                _ = cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Stopping pkl-lsp");
                    child.kill().await?;
                    return Ok(0);
                }
                Some(runtime) = runtime_handle.changed() => {
                    self.host.request_restart(&format!(
                        "Java runtime changed to {} (version {})",
                        runtime.path.display(),
                        runtime.version
                    ));
                }
                Some(distribution) = distribution_handle.changed() => {
                    self.host.request_restart(&format!(
                        "pkl-lsp distribution changed to {} ({})",
                        distribution.version,
                        distribution.path.display()
                    ));
                }
            }
        }
    }

    async fn run_relay(
        &self,
        host: &str,
        port: u16,
        cancel_token: CancellationToken,
    ) -> LauncherResult<i32> {
        info!(target: LOG_TARGET, "Connecting to pkl-lsp at {}:{}", host, port);
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            LauncherError::launch(format!("cannot connect to {}:{}: {}", host, port, e))
        })?;
        tokio::select! {
            result = relay(stream, tokio::io::stdin(), tokio::io::stdout()) => result?,
            _ = cancel_token.cancelled() => {}
        }
        Ok(0)
    }
}
