//! Router-level tests of the upload / list / verify workflow against the
//! in-memory ledger.

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use chainproof_server::config::{Config, LedgerBackend, OrphanPolicy};
use chainproof_server::hasher::hash_bytes;
use chainproof_server::ledger::MemoryLedger;
use chainproof_server::records::RecordService;
use chainproof_server::routes;
use chainproof_server::state::AppState;
use chainproof_server::storage::LocalStore;

const BOUNDARY: &str = "chainproof-test-boundary";

struct TestApp {
    dir: TempDir,
    ledger: Arc<MemoryLedger>,
    router: Router,
}

impl TestApp {
    async fn new(max_upload_bytes: usize, orphan_policy: OrphanPolicy) -> Self {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.ledger.backend = LedgerBackend::Memory;
        config.storage.upload_dir = dir.path().to_path_buf();
        config.storage.max_upload_bytes = max_upload_bytes;
        config.storage.orphan_policy = orphan_policy;

        let ledger = Arc::new(MemoryLedger::new());
        let store = LocalStore::open(dir.path()).await.unwrap();
        let records = RecordService::new(ledger.clone(), store, orphan_policy);
        let router = routes::app(AppState::new(config, records));

        Self { dir, ledger, router }
    }

    fn uploads(&self) -> &Path {
        self.dir.path()
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn upload(&self, uri: &str, filename: &str, data: &[u8]) -> Response<Body> {
        self.send(multipart_request(uri, "file", filename, data)).await
    }

    async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }
}

fn multipart_request(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        b = BOUNDARY,
        field = field,
        name = filename
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response<Body>) -> String {
    let raw = response.headers()[header::LOCATION].to_str().unwrap();
    urlencoding::decode(raw).unwrap().into_owned()
}

#[tokio::test]
async fn test_report_scenario_through_pages() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Retain).await;
    let content = b"%PDF-1.7 quarterly numbers";

    let response = app.upload("/upload", "report.pdf", content).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("/files?notice=File uploaded and metadata stored on chain. Tx: 0x"));
    assert!(target.ends_with("&level=success"));

    let listing = body_text(app.get("/files").await).await;
    assert!(listing.contains("report.pdf"));
    assert!(listing.contains(&hash_bytes(content)));
    assert!(listing.contains("href=\"/verify/0\""));

    let response = app.get("/verify/0").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).contains("Integrity OK for report.pdf (index 0)."));

    // same name again: stored under a suffix, recorded as a separate entry
    let response = app.upload("/upload", "report.pdf", b"revised").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let records = app.ledger.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].index, 1);
    assert_eq!(records[1].filename, "report_1.pdf");
    assert_eq!(
        std::fs::read(app.uploads().join("report.pdf")).unwrap(),
        content
    );
}

#[tokio::test]
async fn test_verify_reports_tampering_and_absence() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Retain).await;
    app.upload("/upload", "notes.txt", b"original text").await;

    std::fs::write(app.uploads().join("notes.txt"), b"edited text").unwrap();
    let target = location(&app.get("/verify/0").await);
    assert!(target.contains("Integrity FAILED for notes.txt (index 0)."));
    assert!(target.contains(&format!("On-chain: {}", hash_bytes(b"original text"))));
    assert!(target.contains(&format!("Local: {}", hash_bytes(b"edited text"))));
    assert!(target.ends_with("&level=error"));

    std::fs::remove_file(app.uploads().join("notes.txt")).unwrap();
    let target = location(&app.get("/verify/0").await);
    assert!(target.contains("Local file not found"));
    assert!(target.ends_with("&level=info"));

    let target = location(&app.get("/verify/9").await);
    assert!(target.contains("Error reading file"));
}

#[tokio::test]
async fn test_upload_input_errors() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Retain).await;

    let response = app.upload("/upload", "", b"data").await;
    assert_eq!(location(&response), "/?notice=No selected file&level=error");

    let response = app
        .send(multipart_request("/upload", "attachment", "a.txt", b"data"))
        .await;
    assert_eq!(location(&response), "/?notice=No file part&level=error");

    let response = app.upload("/api/v1/records", "", b"data").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(std::fs::read_dir(app.uploads()).unwrap().count(), 0);
    assert!(app.ledger.records().await.is_empty());
}

#[tokio::test]
async fn test_oversized_upload_rejected_without_leftovers() {
    let app = TestApp::new(1024, OrphanPolicy::Retain).await;
    let big = vec![7u8; 16 * 1024];

    let response = app.upload("/api/v1/records", "big.bin", &big).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app.upload("/upload", "big.bin", &big).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(std::fs::read_dir(app.uploads()).unwrap().count(), 0);
    assert!(app.ledger.records().await.is_empty());
}

#[tokio::test]
async fn test_ledger_failure_on_upload() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Retain).await;
    app.ledger.set_fail_appends(true);

    let response = app.upload("/upload", "orphan.txt", b"data").await;
    let target = location(&response);
    assert!(target.starts_with("/?notice=Blockchain transaction failed"));
    assert!(target.contains("saved locally as orphan.txt"));
    assert!(app.uploads().join("orphan.txt").exists());

    let response = app.upload("/api/v1/records", "orphan.txt", b"data").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "ledger_error");
}

#[tokio::test]
async fn test_ledger_failure_with_remove_policy() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Remove).await;
    app.ledger.set_fail_appends(true);

    let response = app.upload("/upload", "orphan.txt", b"data").await;
    assert!(location(&response).starts_with("/?notice=Blockchain transaction failed"));
    assert_eq!(std::fs::read_dir(app.uploads()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_count_failure_degrades_pages() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Retain).await;
    app.upload("/upload", "a.txt", b"a").await;
    app.ledger.set_fail_count(true);

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(">N/A<"));
    assert!(page.contains("Error connecting to blockchain for status"));

    let response = app.get("/files").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("No files recorded yet."));
    assert!(page.contains("Failed to read from contract"));
}

#[tokio::test]
async fn test_json_api() {
    let app = TestApp::new(1024 * 1024, OrphanPolicy::Retain).await;

    let response = app.upload("/api/v1/records", "data set.csv", b"a,b\n1,2\n").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = body_json(response).await;
    assert_eq!(receipt["filename"], "data_set.csv");
    assert_eq!(receipt["originalFilename"], "data set.csv");
    assert_eq!(receipt["fileHash"], hash_bytes(b"a,b\n1,2\n"));
    assert_eq!(receipt["size"], 8);

    app.upload("/api/v1/records", "second.csv", b"x").await;
    app.upload("/api/v1/records", "third.csv", b"y").await;
    app.ledger.fail_index(1).await;

    let server = TestServer::new(app.router.clone()).unwrap();

    let listing: Value = server.get("/api/v1/records").await.json();
    let names: Vec<&str> = listing["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["filename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["data_set.csv", "third.csv"]);
    assert_eq!(listing["skipped"], serde_json::json!([1]));

    let record: Value = server.get("/api/v1/records/0").await.json();
    assert_eq!(record["index"], 0);
    assert_eq!(record["uploader"], chainproof_server::ledger::memory::DEFAULT_SIGNER);

    let outcome: Value = server.get("/api/v1/records/0/verify").await.json();
    assert_eq!(outcome["status"], "intact");

    let missing = server.get("/api/v1/records/42").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let health: Value = server.get("/health").await.json();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["ledger"], "memory");
}
