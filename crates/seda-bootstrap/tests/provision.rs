//! Binary download against a mock HTTP server.

mod common;

use common::*;
use seda_bootstrap::provision::provision_binary;
use seda_bootstrap::{Bootstrap, BootstrapError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BINARY: &[u8] = b"\x7fELF fake sedad binary";

#[tokio::test]
async fn test_download_writes_executable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/releases/sedad-amd64"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("bin").join("sedad");
    let url = format!("{}/releases/sedad-amd64", mock_server.uri());

    let bytes = provision_binary(&url, &dest).await.unwrap();

    assert_eq!(bytes, BINARY.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), BINARY);
    assert!(!dir.path().join("bin").join("sedad.part").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[tokio::test]
async fn test_download_replaces_existing_binary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sedad"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sedad");
    std::fs::write(&dest, "old release").unwrap();

    provision_binary(&format!("{}/sedad", mock_server.uri()), &dest)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), BINARY);
}

#[tokio::test]
async fn test_failed_download_removes_partial_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sedad"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory in the way makes the final rename fail.
    let dest = dir.path().join("sedad");
    std::fs::create_dir_all(dest.join("occupied")).unwrap();

    let err = provision_binary(&format!("{}/sedad", mock_server.uri()), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Filesystem { .. }), "{err}");
    assert!(!dir.path().join("sedad.part").exists());
    assert!(dest.join("occupied").is_dir());
}

#[tokio::test]
async fn test_download_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sedad"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sedad");

    let err = provision_binary(&format!("{}/sedad", mock_server.uri()), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Download(ref msg) if msg.contains("404")));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_unreachable_server() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("sedad");

    // Port 9 (discard) is not expected to be listening.
    let err = provision_binary("http://127.0.0.1:9/sedad", &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Download(_)));
}

#[tokio::test]
async fn test_run_downloads_when_not_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sedad-amd64"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BINARY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fixture = Fixture::new();
    fixture.add_gentx("a.json", VALOPER_A, "aseda", "1");
    let mut config = fixture.config();
    config.skip_download = false;
    config.binary_url = format!("{}/sedad-amd64", mock_server.uri());

    let report = Bootstrap::with_runner(config, FakeNode::new())
        .run()
        .await
        .unwrap();

    assert_eq!(report.downloaded_bytes, Some(BINARY.len() as u64));
    assert_eq!(std::fs::read(fixture.binary_path()).unwrap(), BINARY);
}
