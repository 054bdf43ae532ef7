pub mod config;
pub mod distribution;
pub mod error;
pub mod host;
pub mod install;
pub mod launch;
pub mod runtime;
pub mod semver;
pub mod sync;
pub mod update;

pub use config::{LauncherSettings, SettingKey, SettingsStore};
pub use distribution::{DistributionResolver, ServerDistribution};
pub use error::{LauncherError, LauncherResult};
pub use host::{Host, LogHost, Notice, TerminalHost};
pub use launch::{Launcher, ServerCommand};
pub use runtime::{JavaRuntime, RuntimeLocator, SystemEnv};
pub use semver::Semver;
pub use update::{UpdateContext, UpdateOutcome, check_for_update, download_server};
