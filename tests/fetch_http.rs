//! HTTP tests for the archive fetcher, against a local mock server.

use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Run the blocking fetcher off the async test runtime.
async fn fetch_blocking(url: String, dest: PathBuf) -> kindling::Result<()> {
    tokio::task::spawn_blocking(move || kindling::fetch(&url, &dest))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_downloads_once_and_preserves_mtime() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pikchr.tar.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"tarball payload".to_vec())
                .insert_header("Last-Modified", "Sun, 06 Nov 1994 08:49:37 GMT"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("cache/pikchr.tar.gz");
    let url = format!("{}/pikchr.tar.gz", server.uri());

    fetch_blocking(url.clone(), dest.clone()).await.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"tarball payload");
    let md = std::fs::metadata(&dest).unwrap();
    assert_eq!(
        filetime::FileTime::from_last_modification_time(&md).unix_seconds(),
        784_111_777
    );

    // Second call is a no-op; expect(1) verifies on server drop.
    fetch_blocking(url, dest.clone()).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"tarball payload");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_without_last_modified_still_lands() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("plain.bin");

    fetch_blocking(format!("{}/plain.bin", server.uri()), dest.clone())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"data");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_http_error_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.tar.gz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("missing.tar.gz");

    let err = fetch_blocking(format!("{}/missing.tar.gz", server.uri()), dest.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, kindling::Error::Transport { .. }));
    assert!(!dest.exists());
}
