use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use pkl_lsp_launcher::config::{self, LauncherSettings, SettingsStore, load_settings};
use pkl_lsp_launcher::install::maven::FetchOptions;
use pkl_lsp_launcher::{
    Host, Launcher, LauncherResult, LogHost, Semver, SystemEnv, TerminalHost, UpdateContext,
    UpdateOutcome, check_for_update, download_server,
};

/// Launch the Pkl language server with a suitable Java runtime
#[derive(Parser)]
#[command(name = "pkl-lsp-launcher")]
#[command(version)]
#[command(about = "Launch the Pkl language server with a suitable Java runtime")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/pkl-lsp-launcher/config.toml)
    #[arg(long = "config", value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pkl-lsp over stdio (the default)
    Launch {
        /// Accept the update download without asking
        #[arg(long)]
        yes: bool,
    },
    /// Print the Java runtime and pkl-lsp distribution that would be used
    Resolve {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check Maven Central for a newer compatible pkl-lsp
    CheckUpdate {
        /// Download without asking
        #[arg(long)]
        yes: bool,

        /// Ignore the cached registry metadata
        #[arg(long)]
        no_cache: bool,
    },
    /// Download pkl-lsp into the distribution cache
    Download {
        /// Version to download (default: latest)
        #[arg(value_name = "VERSION")]
        release: Option<Semver>,
    },
    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config_file.or_else(config::user_config_path);

    let result = match cli.command {
        None => launch(config_path, false).await,
        Some(Commands::Launch { yes }) => launch(config_path, yes).await,
        Some(Commands::Resolve { json }) => resolve(config_path, json).await,
        Some(Commands::CheckUpdate { yes, no_cache }) => {
            check_update(config_path, yes, no_cache).await
        }
        Some(Commands::Download { release }) => download(config_path, release).await,
        Some(Commands::Config { action }) => config_command(config_path, action),
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Settings for user-initiated commands: a broken file is an error.
fn load_strict(config_path: Option<&PathBuf>) -> LauncherResult<LauncherSettings> {
    match config_path {
        Some(path) => Ok(load_settings(path)?),
        None => Ok(LauncherSettings::default()),
    }
}

async fn launch(config_path: Option<PathBuf>, assume_yes: bool) -> LauncherResult<i32> {
    // The editor is waiting on stdio; a broken config must not stop the server.
    let settings = match load_strict(config_path.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("{}; using default settings", e);
            LauncherSettings::default()
        }
    };

    let store = Arc::new(SettingsStore::new(settings, config_path.clone()));
    let host: Arc<dyn Host> = Arc::new(LogHost::new(assume_yes));
    let launcher = Launcher::new(store, host, SystemEnv::from_env())?;

    let cancel_token = CancellationToken::new();
    if let Some(path) = config_path {
        launcher.watch_config(path, cancel_token.clone());
    }
    launcher.spawn_update_check();

    let result = launcher.run(cancel_token.clone()).await;
    cancel_token.cancel();
    result
}

async fn resolve(config_path: Option<PathBuf>, json: bool) -> LauncherResult<i32> {
    let settings = load_strict(config_path.as_ref())?;
    let store = Arc::new(SettingsStore::new(settings, config_path.clone()));
    let host: Arc<dyn Host> = Arc::new(TerminalHost::new(false, config_path));
    let launcher = Launcher::new(store, host, SystemEnv::from_env())?;

    let (runtime, distribution) = launcher.resolve_all().await?;
    if json {
        let output = serde_json::json!({
            "runtime": &*runtime,
            "distribution": &*distribution,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(|e| {
                pkl_lsp_launcher::LauncherError::internal(e.to_string())
            })?
        );
    } else {
        println!("java:    {} (version {})", runtime.path.display(), runtime.version);
        println!(
            "pkl-lsp: {} (version {}, {})",
            distribution.path.display(),
            distribution.version,
            distribution.source
        );
    }
    Ok(0)
}

async fn check_update(
    config_path: Option<PathBuf>,
    assume_yes: bool,
    no_cache: bool,
) -> LauncherResult<i32> {
    let settings = load_strict(config_path.as_ref())?;
    let ctx = UpdateContext::from_settings(&settings)?.with_fetch_options(FetchOptions {
        use_cache: !no_cache,
    });
    let host: Arc<dyn Host> = Arc::new(TerminalHost::new(assume_yes, config_path));

    let code = match check_for_update(&ctx, host).await {
        UpdateOutcome::Incompatible { latest } => {
            println!("Latest pkl-lsp {} is not compatible with this launcher", latest);
            0
        }
        UpdateOutcome::AlreadyDownloaded { latest } => {
            println!("Latest pkl-lsp {} is already downloaded", latest);
            0
        }
        UpdateOutcome::UpToDate { latest } => {
            println!("Up to date (latest pkl-lsp is {})", latest);
            0
        }
        UpdateOutcome::Declined { latest } => {
            println!("Skipped pkl-lsp {}", latest);
            0
        }
        UpdateOutcome::Downloaded { version, path } => {
            println!("Downloaded pkl-lsp {} to {}", version, path.display());
            0
        }
        UpdateOutcome::Failed(message) => {
            eprintln!("Error: {}", message);
            1
        }
    };
    Ok(code)
}

async fn download(config_path: Option<PathBuf>, version: Option<Semver>) -> LauncherResult<i32> {
    let settings = load_strict(config_path.as_ref())?;
    let ctx = UpdateContext::from_settings(&settings)?;
    let distribution = download_server(&ctx, version).await?;
    println!(
        "pkl-lsp {} is at {}",
        distribution.version,
        distribution.path.display()
    );
    Ok(0)
}

fn config_command(config_path: Option<PathBuf>, action: ConfigCommand) -> LauncherResult<i32> {
    let Some(path) = config_path else {
        eprintln!("Error: Could not determine the configuration directory. Please pass --config.");
        return Ok(1);
    };
    match action {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Check => {
            if !path.exists() {
                println!("{} does not exist; defaults are used", path.display());
            } else {
                load_settings(&path)?;
                println!("{} is valid", path.display());
            }
        }
    }
    Ok(0)
}
