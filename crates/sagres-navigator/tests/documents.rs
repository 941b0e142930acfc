//! Report document downloads.

mod common;

use common::{fixture, html, navigator, portal_path};
use sagres_navigator::operation::codes;
use sagres_navigator::operations::DocumentOperation;
use sagres_navigator::{Endpoint, Status};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF: &[u8] = b"%PDF-1.4\n% historico\n%%EOF\n";

async fn mount_history(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::History)))
        .respond_with(html(&fixture("history.html")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Portal/Reports/Historico.pdf"))
        .and(query_param("id", "9"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(PDF),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Serves one response that promises more bytes than it sends.
async fn truncated_file_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/pdf\r\ncontent-length: 1000\r\n\r\n%PDF-partial",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}/Historico.pdf")
}

#[tokio::test]
async fn test_history_is_written_to_disk() {
    let server = MockServer::start().await;
    mount_history(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("historico.pdf");
    std::fs::write(&destination, b"stale").unwrap();

    let result = navigator(&server).download_history(&destination).await;

    assert_eq!(result.status(), Status::Success);
    assert_eq!(result.code(), Some(200));
    let downloaded = result.payload().unwrap();
    assert_eq!(downloaded.bytes, PDF.len() as u64);
    assert_eq!(std::fs::read(&destination).unwrap(), PDF);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_page_without_document_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::Flowchart)))
        .respond_with(html("<p>Fluxograma indisponível</p>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("fluxograma.pdf");
    let result = navigator(&server).download_flowchart(&destination).await;

    assert_eq!(result.status(), Status::ResponseFailed);
    assert_eq!(result.code(), Some(codes::DOCUMENT_LINK_NOT_FOUND));
    assert_eq!(result.message(), Some("Link not found"));
    assert!(result.document().is_some());
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_missing_document_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::EnrollmentCertificate)))
        .respond_with(html(r#"<embed src="/Portal/Reports/Comprovante.pdf">"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Portal/Reports/Comprovante.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = navigator(&server)
        .download_enrollment(&dir.path().join("comprovante.pdf"))
        .await;

    assert_eq!(result.status(), Status::ResponseFailed);
    assert_eq!(result.code(), Some(404));
}

#[tokio::test]
async fn test_interrupted_download_keeps_previous_file() {
    let server = MockServer::start().await;
    let file_url = truncated_file_server().await;
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::History)))
        .respond_with(html(&format!(r#"<iframe src="{file_url}"></iframe>"#)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("historico.pdf");
    std::fs::write(&destination, b"previous good document").unwrap();

    let result = navigator(&server).download_history(&destination).await;

    assert_eq!(result.status(), Status::NetworkError);
    assert!(result.cause().is_some());
    assert_eq!(std::fs::read(&destination).unwrap(), b"previous good document");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_download_submitted_to_executor() {
    let server = MockServer::start().await;
    mount_history(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("historico.pdf");
    let navigator = navigator(&server);
    let operation = DocumentOperation::new(
        navigator.session().clone(),
        Endpoint::History,
        destination.clone(),
    )
    .with_executor(navigator.executor().clone());

    let result = navigator.submit(operation).await.unwrap().unwrap();

    assert_eq!(result.status(), Status::Success);
    assert_eq!(result.payload().unwrap().path, destination);
    assert_eq!(std::fs::read(&destination).unwrap(), PDF);
    let executor = navigator.executor();
    assert_eq!(executor.available_network(), navigator.config().network_threads.max(1));
    assert_eq!(executor.available_disk(), navigator.config().disk_threads.max(1));
}
