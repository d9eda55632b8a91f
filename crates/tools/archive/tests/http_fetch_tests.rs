//! Fetcher tests against a one-shot local HTTP server.

use rigging_core::{ArchiveFetcher, ArchiveKind, Error, FetchRequest};
use rigging_tools_archive::HttpArchiveFetcher;
use std::io::{Cursor, Write};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve a single response and return the base URL.
async fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0_u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();

        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

fn zip_with(name: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(name, zip::write::SimpleFileOptions::default().unix_permissions(0o755))
        .unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap().into_inner()
}

fn request<'a>(url: &'a str, destination: &'a Path, kind: ArchiveKind) -> FetchRequest<'a> {
    FetchRequest {
        id: "lsp",
        url,
        destination,
        archive_kind: kind,
        extract_path: None,
        binary_name: Some("lsp"),
    }
}

#[tokio::test]
async fn test_downloads_and_extracts_zip() {
    let base = serve_once("200 OK", zip_with("lsp", b"server")).await;
    let url = format!("{base}/lsp.zip");
    let temp = tempfile::TempDir::new().unwrap();

    HttpArchiveFetcher::new()
        .unwrap()
        .download_and_extract(&request(&url, temp.path(), ArchiveKind::Zip))
        .await
        .unwrap();

    assert_eq!(std::fs::read(temp.path().join("lsp")).unwrap(), b"server");
}

#[tokio::test]
async fn test_not_found_is_transport_error() {
    let base = serve_once("404 Not Found", b"missing".to_vec()).await;
    let url = format!("{base}/lsp.zip");
    let temp = tempfile::TempDir::new().unwrap();

    let err = HttpArchiveFetcher::new()
        .unwrap()
        .download_and_extract(&request(&url, temp.path(), ArchiveKind::Zip))
        .await
        .unwrap_err();

    match err {
        Error::Transport { message, .. } => assert!(message.contains("404")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_html_error_page_is_format_error() {
    let page = b"<!DOCTYPE html><html><body>Sign in to continue</body></html>".to_vec();
    let base = serve_once("200 OK", page).await;
    let url = format!("{base}/lsp");
    let temp = tempfile::TempDir::new().unwrap();
    let target = temp.path().join("lsp");

    let err = HttpArchiveFetcher::new()
        .unwrap()
        .download_and_extract(&request(&url, &target, ArchiveKind::RawBinary))
        .await
        .unwrap_err();

    match err {
        Error::Format { url: failed, kind, .. } => {
            assert_eq!(failed, url);
            assert_eq!(kind, "raw-binary");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!target.exists());
}
