//! Runtime and distribution resolution with fake `java` executables.

#![cfg(unix)]

mod helpers;

use std::path::PathBuf;

use helpers::fake_java;
use pkl_lsp_launcher::distribution::{
    DistributionCache, DistributionResolver, DistributionSource, ServerDistribution,
};
use pkl_lsp_launcher::runtime::{RuntimeError, locate_from_system};
use pkl_lsp_launcher::{Host, LauncherSettings, Notice, RuntimeLocator, Semver, SystemEnv};
use tempfile::{TempDir, tempdir};

struct QuietHost;

impl Host for QuietHost {
    fn notify(&self, _notice: Notice) {}
    fn prompt(&self, _message: &str, _accept_label: &str) -> bool {
        false
    }
    fn request_restart(&self, _reason: &str) {}
}

fn path_var(dirs: &[PathBuf]) -> Option<std::ffi::OsString> {
    Some(std::env::join_paths(dirs).unwrap())
}

#[tokio::test]
async fn first_qualifying_runtime_on_path_wins_over_first_found() {
    let temp = tempdir().unwrap();
    let jdk17 = temp.path().join("jdk-17/bin");
    let jdk22 = temp.path().join("jdk-22/bin");
    fake_java::install(&jdk17, "17.0.12");
    let expected = fake_java::install(&jdk22, "22.0.2");

    let env = SystemEnv {
        path: path_var(&[jdk17, jdk22]),
        ..SystemEnv::default()
    };
    let runtime = locate_from_system(&env).await.unwrap();

    assert_eq!(runtime.path, expected);
    assert_eq!(runtime.version, 22);
}

#[tokio::test]
async fn no_qualifying_runtime_reports_minimum() {
    let temp = tempdir().unwrap();
    let jdk17 = temp.path().join("jdk-17/bin");
    fake_java::install(&jdk17, "17.0.12");

    let env = SystemEnv {
        path: path_var(&[jdk17]),
        ..SystemEnv::default()
    };
    let err = locate_from_system(&env).await.unwrap_err();
    assert_eq!(err, RuntimeError::NotFound { minimum: 22 });
    assert!(err.to_string().contains("22"));
}

struct World {
    temp: TempDir,
    locator: RuntimeLocator,
    resolver: DistributionResolver,
}

impl World {
    async fn new() -> Self {
        let temp = tempdir().unwrap();
        let jdk = temp.path().join("jdk/bin");
        fake_java::install(&jdk, "22.0.2");
        let locator = RuntimeLocator::new(SystemEnv {
            path: path_var(&[jdk]),
            ..SystemEnv::default()
        });
        locator
            .resolve(&LauncherSettings::default(), &QuietHost)
            .await
            .unwrap();

        let bundled = temp.path().join("bundled/pkl-lsp.jar");
        fake_java::write_jar(&bundled, "0.6.0");
        let resolver = DistributionResolver::new(
            ServerDistribution {
                path: bundled,
                version: Semver::new(0, 6, 0),
                source: DistributionSource::Bundled,
            },
            Some(DistributionCache::new(temp.path().join("cache"))),
        );
        Self {
            temp,
            locator,
            resolver,
        }
    }

    fn cache_jar(&self, version: &str) {
        let cache = self.resolver.cache().unwrap();
        fake_java::write_jar(&cache.jar_path(&Semver::parse(version).unwrap()), version);
    }

    async fn resolve(&self, settings: &LauncherSettings) -> ServerDistribution {
        let resolved = self
            .resolver
            .resolve(settings, &self.locator.handle(), &QuietHost)
            .await
            .unwrap();
        (*resolved).clone()
    }
}

#[tokio::test]
async fn configured_distribution_beats_newer_cache_and_bundled() {
    let world = World::new().await;
    world.cache_jar("0.6.5");
    let configured = world.temp.path().join("custom/pkl-lsp.jar");
    fake_java::write_jar(&configured, "0.6.0-SNAPSHOT");

    let mut settings = LauncherSettings::default();
    settings.lsp.path = Some(configured.clone());
    let selected = world.resolve(&settings).await;

    assert_eq!(selected.path, configured);
    assert_eq!(selected.source, DistributionSource::Configured);
}

#[tokio::test]
async fn newer_compatible_cache_beats_bundled() {
    let world = World::new().await;
    world.cache_jar("0.6.1");
    world.cache_jar("0.6.3");
    world.cache_jar("0.7.0");

    let selected = world.resolve(&LauncherSettings::default()).await;

    assert_eq!(selected.version, Semver::new(0, 6, 3));
    assert_eq!(selected.source, DistributionSource::Downloaded);
}

#[tokio::test]
async fn bundled_is_used_when_cache_is_not_newer() {
    let world = World::new().await;
    world.cache_jar("0.6.0");
    world.cache_jar("0.7.0");

    let selected = world.resolve(&LauncherSettings::default()).await;

    assert_eq!(selected.version, Semver::new(0, 6, 0));
    assert_eq!(selected.source, DistributionSource::Bundled);
}

#[tokio::test]
async fn broken_configured_jar_does_not_fall_back() {
    let world = World::new().await;
    world.cache_jar("0.6.3");
    let mut settings = LauncherSettings::default();
    settings.lsp.path = Some(world.temp.path().join("does-not-exist.jar"));

    let result = world
        .resolver
        .resolve(&settings, &world.locator.handle(), &QuietHost)
        .await;

    assert!(result.is_err());
    assert!(world.resolver.current().is_none());
}
