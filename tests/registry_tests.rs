//! Maven registry client against a local repository.

mod helpers;

use helpers::http_server::{Route, TestServer};
use pkl_lsp_launcher::Semver;
use pkl_lsp_launcher::install::cache::MetadataCache;
use pkl_lsp_launcher::install::fetch::sha256_hex;
use pkl_lsp_launcher::install::maven::{Coordinate, FetchOptions, MavenClient, RegistryError};
use tempfile::tempdir;

const METADATA_PATH: &str = "/maven2/org/pkl-lang/pkl-lsp/maven-metadata.xml";

fn metadata(latest: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.pkl-lang</groupId>
  <artifactId>pkl-lsp</artifactId>
  <versioning>
    <latest>{latest}</latest>
    <release>{latest}</release>
    <versions>
      <version>0.5.0</version>
      <version>{latest}</version>
    </versions>
  </versioning>
</metadata>
"#
    )
}

fn client(server: &TestServer) -> MavenClient {
    MavenClient::new(&format!("{}/maven2", server.base_url()), reqwest::Client::new()).unwrap()
}

#[tokio::test]
async fn latest_version_reads_metadata() {
    let server = TestServer::start(vec![(METADATA_PATH, Route::ok(metadata("0.6.2")))]).await;

    let latest = client(&server)
        .latest_version(&Coordinate::pkl_lsp())
        .await
        .unwrap();

    assert_eq!(latest, Semver::new(0, 6, 2));
    assert_eq!(server.requests(), vec![METADATA_PATH.to_string()]);
}

#[tokio::test]
async fn every_group_dot_becomes_a_path_segment() {
    let path = "/maven2/com/example/tools/thing/maven-metadata.xml";
    let server = TestServer::start(vec![(path, Route::ok(metadata("1.2.3")))]).await;

    let latest = client(&server)
        .latest_version(&Coordinate::new("com.example.tools", "thing"))
        .await
        .unwrap();

    assert_eq!(latest, Semver::new(1, 2, 3));
}

#[tokio::test]
async fn release_is_used_without_latest() {
    let xml = "<metadata><versioning><release>0.6.1</release></versioning></metadata>";
    let server = TestServer::start(vec![(METADATA_PATH, Route::ok(xml))]).await;

    let latest = client(&server)
        .latest_version(&Coordinate::pkl_lsp())
        .await
        .unwrap();
    assert_eq!(latest, Semver::new(0, 6, 1));
}

#[tokio::test]
async fn non_semver_latest_is_rejected() {
    let server = TestServer::start(vec![(METADATA_PATH, Route::ok(metadata("0.6")))]).await;

    let result = client(&server).latest_version(&Coordinate::pkl_lsp()).await;
    match result {
        Err(RegistryError::InvalidRemoteVersion(version)) => assert_eq!(version, "0.6"),
        other => panic!("expected InvalidRemoteVersion, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_metadata_is_http_error() {
    let server = TestServer::start(vec![]).await;
    let result = client(&server).latest_version(&Coordinate::pkl_lsp()).await;
    assert!(matches!(result, Err(RegistryError::Http { .. })));
}

#[tokio::test]
async fn metadata_cache_avoids_second_request() {
    let server = TestServer::start(vec![(METADATA_PATH, Route::ok(metadata("0.6.2")))]).await;
    let temp = tempdir().unwrap();
    let client = client(&server).with_metadata_cache(MetadataCache::with_default_ttl(temp.path()));

    client.latest_version(&Coordinate::pkl_lsp()).await.unwrap();
    client.latest_version(&Coordinate::pkl_lsp()).await.unwrap();
    assert_eq!(server.requests().len(), 1);

    client
        .latest_version_with_options(&Coordinate::pkl_lsp(), FetchOptions { use_cache: false })
        .await
        .unwrap();
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn unparsable_metadata_is_not_cached() {
    let server = TestServer::start(vec![(METADATA_PATH, Route::ok("<html>login</html>"))]).await;
    let temp = tempdir().unwrap();
    let cache = MetadataCache::with_default_ttl(temp.path());
    let client = client(&server).with_metadata_cache(cache.clone());

    for _ in 0..2 {
        let result = client.latest_version(&Coordinate::pkl_lsp()).await;
        assert!(matches!(result, Err(RegistryError::InvalidRemoteVersion(_))));
    }

    assert_eq!(server.requests().len(), 2);
    assert!(cache.read(&Coordinate::pkl_lsp()).is_none());
}

#[tokio::test]
async fn unparsable_cached_metadata_is_refetched() {
    let server = TestServer::start(vec![(METADATA_PATH, Route::ok(metadata("0.6.2")))]).await;
    let temp = tempdir().unwrap();
    let cache = MetadataCache::with_default_ttl(temp.path());
    cache
        .write(&Coordinate::pkl_lsp(), &metadata("not-a-version"))
        .unwrap();
    let client = client(&server).with_metadata_cache(cache.clone());

    let latest = client.latest_version(&Coordinate::pkl_lsp()).await.unwrap();

    assert_eq!(latest, Semver::new(0, 6, 2));
    assert_eq!(server.requests().len(), 1);
    assert!(cache.read(&Coordinate::pkl_lsp()).unwrap().contains("0.6.2"));
}

#[tokio::test]
async fn download_artifact_verifies_against_published_checksum() {
    let jar = b"pkl-lsp 0.6.2 jar bytes".to_vec();
    let jar_path = "/maven2/org/pkl-lang/pkl-lsp/0.6.2/pkl-lsp-0.6.2.jar";
    let checksum_path = "/maven2/org/pkl-lang/pkl-lsp/0.6.2/pkl-lsp-0.6.2.jar.sha256";
    let server = TestServer::start(vec![
        (jar_path, Route::ok(jar.clone())),
        (checksum_path, Route::ok(sha256_hex(&jar))),
    ])
    .await;
    let temp = tempdir().unwrap();
    let destination = temp.path().join("0.6.2/pkl-lsp-0.6.2.jar");

    client(&server)
        .download_artifact(&Coordinate::pkl_lsp(), &Semver::new(0, 6, 2), &destination)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), jar);
    assert_eq!(
        server.requests(),
        vec![checksum_path.to_string(), jar_path.to_string()]
    );
}

#[tokio::test]
async fn download_artifact_rejects_tampered_jar() {
    let jar_path = "/maven2/org/pkl-lang/pkl-lsp/0.6.2/pkl-lsp-0.6.2.jar";
    let checksum_path = "/maven2/org/pkl-lang/pkl-lsp/0.6.2/pkl-lsp-0.6.2.jar.sha256";
    let server = TestServer::start(vec![
        (jar_path, Route::ok("tampered")),
        (checksum_path, Route::ok(sha256_hex(b"original"))),
    ])
    .await;
    let temp = tempdir().unwrap();
    let destination = temp.path().join("pkl-lsp-0.6.2.jar");

    let result = client(&server)
        .download_artifact(&Coordinate::pkl_lsp(), &Semver::new(0, 6, 2), &destination)
        .await;

    assert!(matches!(result, Err(RegistryError::Fetch(_))));
    assert!(!destination.exists());
}
