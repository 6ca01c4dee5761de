use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use univia_storage::drive::ServiceAccountKey;
use univia_storage::{DocumentStore, DriveStore, StorageError, UploadRequest};

const SERVICE_KEY: &str = include_str!("fixtures/service_key.pem");
const ACCESS_TOKEN: &str = "drive-test-token";

#[derive(Default)]
struct FakeDrive {
    token_requests: AtomicUsize,
    uploads: AtomicUsize,
    received: Mutex<Vec<usize>>,
    reject: AtomicBool,
}

async fn token(State(drive): State<Arc<FakeDrive>>) -> impl IntoResponse {
    drive.token_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "access_token": ACCESS_TOKEN, "expires_in": 3600, "token_type": "Bearer" }))
}

async fn upload(State(drive): State<Arc<FakeDrive>>, headers: HeaderMap, body: Bytes) -> Response {
    let bearer = format!("Bearer {}", ACCESS_TOKEN);
    if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(bearer.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if drive.reject.load(Ordering::SeqCst) {
        return (StatusCode::FORBIDDEN, "insufficient permissions for folder").into_response();
    }
    drive.received.lock().unwrap().push(body.len());
    let n = drive.uploads.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "id": format!("file-{}", n), "webViewLink": "ignored" })).into_response()
}

async fn serve() -> (DriveStore, Arc<FakeDrive>) {
    let drive = Arc::new(FakeDrive::default());
    let app = Router::new()
        .route("/token", post(token))
        .route("/upload", post(upload))
        .with_state(drive.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let key = ServiceAccountKey {
        client_email: "uploader@univia-test.iam.gserviceaccount.com".into(),
        private_key: SERVICE_KEY.into(),
        token_uri: format!("{}/token", base),
    };
    let store = DriveStore::new(key).unwrap().with_upload_url(format!("{}/upload", base));
    (store, drive)
}

fn request(name: &str, size: usize) -> UploadRequest {
    UploadRequest {
        folder: "certificates-folder".into(),
        name: name.into(),
        content_type: "application/pdf".into(),
        bytes: Bytes::from(vec![b'%'; size]),
    }
}

#[tokio::test]
async fn one_token_serves_consecutive_uploads() {
    let (store, drive) = serve().await;

    let first = store.upload(request("Certificate_A.pdf", 1024), &|_: u8| {}).await.unwrap();
    let second = store.upload(request("Certificate_B.pdf", 2048), &|_: u8| {}).await.unwrap();

    assert_eq!(drive.token_requests.load(Ordering::SeqCst), 1);
    assert_eq!(drive.uploads.load(Ordering::SeqCst), 2);
    assert_eq!(first.file_id, "file-1");
    assert_eq!(second.file_id, "file-2");
    assert!(first.link.contains("file-1"));
    assert_eq!(second.size, 2048);

    // Multipart framing wraps the document on both sides.
    let received = drive.received.lock().unwrap().clone();
    assert!(received[0] > 1024);
    assert!(received[1] > 2048);
}

#[tokio::test]
async fn progress_follows_sent_chunks_and_ends_at_100() {
    let (store, _drive) = serve().await;

    let seen = Mutex::new(Vec::new());
    // Four chunks of 256 KiB.
    store
        .upload(request("Eca_Chess.pdf", 1024 * 1024), &|p: u8| seen.lock().unwrap().push(p))
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen, vec![0, 20, 50, 70, 90, 100]);
}

#[tokio::test]
async fn non_success_reply_is_rejected_without_progress_completion() {
    let (store, drive) = serve().await;
    drive.reject.store(true, Ordering::SeqCst);

    let seen = Mutex::new(Vec::new());
    let err = store
        .upload(request("Leave_Fever.pdf", 4096), &|p: u8| seen.lock().unwrap().push(p))
        .await
        .unwrap_err();

    match err {
        StorageError::Rejected { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("insufficient permissions"));
        }
        other => panic!("expected a rejection, got {:?}", other),
    }
    assert!(!seen.into_inner().unwrap().contains(&100));
}

#[tokio::test]
async fn empty_document_never_contacts_drive() {
    let (store, drive) = serve().await;

    let err = store.upload(request("Leave_Empty.pdf", 0), &|_: u8| {}).await.unwrap_err();
    assert!(matches!(err, StorageError::Empty));
    assert_eq!(drive.token_requests.load(Ordering::SeqCst), 0);
}
