//! File download and upload against a mock Mendeley API

mod common;

use common::*;
use mendeley_core::api::files::FileParams;
use mendeley_core::download::stream::part_path;
use mendeley_core::download::{DownloadState, ProgressCallback};
use mendeley_core::{MendeleyClient, MendeleyError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn recording_progress() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
    (callback, seen)
}

fn binary(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn mount_download(server: &MockServer, file_id: Uuid, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}", file_id)))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("Location", format!("{}/storage/{}", server.uri(), file_id).as_str()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/storage/{}", file_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_follows_redirect_without_credentials() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();
    let body = binary(100_000);
    mount_download(&server, file_id, body.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("paper.pdf");
    let (progress, seen) = recording_progress();

    let written = client
        .download_file(file_id, &target, Some(progress))
        .await
        .unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), body);
    assert!(!part_path(&target).exists());
    assert_eq!(client.downloads().state(&file_id.to_string()), Some(DownloadState::Completed));

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap().to_str().unwrap(),
        bearer(OLD_TOKEN)
    );
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_cancelled_download_leaves_no_files() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();
    mount_download(&server, file_id, binary(256 * 1024)).await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("paper.pdf");

    // Cancel by file id as soon as the first progress report arrives
    let canceller: MendeleyClient = client.clone();
    let progress: ProgressCallback = Arc::new(move |_| {
        canceller.cancel_download(file_id);
    });

    let result = client.download_file(file_id, &target, Some(progress)).await;

    assert!(matches!(result, Err(MendeleyError::UserCancelled)));
    assert!(!target.exists());
    assert!(!part_path(&target).exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(client.downloads().state(&file_id.to_string()), Some(DownloadState::Cancelled));
    assert!(!client.downloads().is_active(&file_id.to_string()));
}

#[tokio::test]
async fn test_download_cancelled_before_start_sends_nothing() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();
    mount_download(&server, file_id, binary(1024)).await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("paper.pdf");
    let token = CancellationToken::new();
    token.cancel();

    let result = client
        .download_file_with_token(file_id, &target, None, token)
        .await;

    assert!(matches!(result, Err(MendeleyError::UserCancelled)));
    assert!(!target.exists());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_rename_is_file_download_error() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();
    mount_download(&server, file_id, binary(2048)).await;

    // A non-empty directory cannot be replaced by a file
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("occupied");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), b"x").unwrap();

    let err = client.download_file(file_id, &target, None).await.unwrap_err();
    match err {
        MendeleyError::FileDownload { reason, file_id: id } => {
            assert_eq!(reason, "Cannot rename downloaded file");
            assert_eq!(id, file_id.to_string());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!part_path(&target).exists());
    assert_eq!(client.downloads().state(&file_id.to_string()), Some(DownloadState::Failed));
}

#[tokio::test]
async fn test_download_of_missing_file_is_http_error() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/files/{}", file_id)))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("paper.pdf");
    let err = client.download_file(file_id, &target, None).await.unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert!(!target.exists());
    assert!(!part_path(&target).exists());
}

#[tokio::test]
async fn test_upload_streams_file_with_headers() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let document_id = Uuid::new_v4();
    let file_id = Uuid::new_v4();
    let body = binary(10_000);

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("my paper.pdf");
    std::fs::write(&source, &body).unwrap();

    let document_link = format!("<{}/documents/{}>; rel=\"document\"", server.uri(), document_id);
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("content-type", "application/pdf"))
        .and(header("content-disposition", "attachment; filename*=UTF-8''my%20paper.pdf"))
        .and(header("link", document_link.as_str()))
        .and(header("content-length", "10000"))
        .and(header("authorization", bearer(OLD_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": file_id.to_string(),
            "document_id": document_id.to_string(),
            "mime_type": "application/pdf",
            "file_name": "my paper.pdf",
            "size": 10000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (progress, seen) = recording_progress();
    let uploaded = client
        .upload_file(document_id, source, "application/pdf", Some(progress))
        .await
        .unwrap();

    assert_eq!(uploaded.resource.id, file_id);
    assert_eq!(uploaded.resource.document_id, document_id);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, body);

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn test_upload_is_resent_in_full_after_token_refresh() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let document_id = Uuid::new_v4();
    let body = binary(9000);

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    std::fs::write(&source, &body).unwrap();

    refresh_grant().expect(1).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("authorization", bearer(OLD_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_string("Token has expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("authorization", bearer(NEW_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": Uuid::new_v4().to_string(),
            "document_id": document_id.to_string()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (progress, seen) = recording_progress();
    client
        .upload_file(document_id, source, "text/plain", Some(progress))
        .await
        .unwrap();

    // Both attempts report through one callback without starting over
    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "progress went backwards: {:?}", *seen);
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);

    let uploads: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/files")
        .collect();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[1].body, body);
}

#[tokio::test]
async fn test_cancelled_upload_is_user_cancelled() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let document_id = Uuid::new_v4();

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("large.pdf");
    std::fs::write(&source, binary(256 * 1024)).unwrap();

    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": Uuid::new_v4().to_string(),
            "document_id": document_id.to_string()
        })))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress: ProgressCallback = Arc::new(move |_| trigger.cancel());

    let result = client
        .upload_file_with_token(document_id, source, "application/pdf", Some(progress), cancel)
        .await;

    assert!(matches!(result, Err(MendeleyError::UserCancelled)), "{:?}", result);
}

#[tokio::test]
async fn test_upload_without_response_times_out() {
    let server = MockServer::start().await;
    let (client, _) =
        client_with_read_timeout(&server, Some(fresh_credentials()), Duration::from_millis(300));
    let document_id = Uuid::new_v4();

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("paper.pdf");
    std::fs::write(&source, binary(8192)).unwrap();

    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({
                    "id": Uuid::new_v4().to_string(),
                    "document_id": document_id.to_string()
                })),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let err = client
        .upload_file(document_id, source, "application/pdf", None)
        .await
        .unwrap_err();

    assert!(
        matches!(err, MendeleyError::Network { is_transient: true, .. }),
        "unexpected error: {:?}",
        err
    );
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_list_files_by_document() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let document_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("document_id", document_id.to_string().as_str()))
        .and(header("content-type", "application/vnd.mendeley-file.1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4().to_string(),
            "document_id": document_id.to_string(),
            "filehash": "abc"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let params = FileParams {
        document_id: Some(document_id),
        ..Default::default()
    };
    let files = client.list_files(&params).await.unwrap();
    assert_eq!(files.resource.len(), 1);
    assert_eq!(files.resource[0].file_hash.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_download_to_dir_uses_disposition_name() {
    let server = MockServer::start().await;
    let (client, _) = client_for(&server, Some(fresh_credentials()));
    let file_id = Uuid::new_v4();
    let body = binary(4096);

    Mock::given(method("GET"))
        .and(path(format!("/files/{}", file_id)))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("Location", format!("/storage/{}", file_id).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/storage/{}", file_id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"Smith 2014.pdf\"")
                .set_body_bytes(body.clone()),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (written_to, bytes) = client
        .download_file_to_dir(file_id, dir.path(), None)
        .await
        .unwrap();

    assert_eq!(written_to, dir.path().join("Smith 2014.pdf"));
    assert_eq!(bytes, 4096);
    assert_eq!(std::fs::read(&written_to).unwrap(), body);
}
