//! API integration tests.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use picvid_api::{create_router, ApiConfig, AppState};
use picvid_jobs::{InMemoryJobRegistry, JobRegistry};
use picvid_media::{
    total_duration_ms, EncoderEvent, EncoderEvents, MediaResult, SlideshowClip, SlideshowEncoder,
    STAGE_OUTPUT_TIME,
};
use picvid_worker::{SlideshowOrchestrator, WorkerConfig};

const BOUNDARY: &str = "picvid-test-boundary";
const VIDEO_BYTES: &[u8] = b"not really an mp4";

/// Writes a fixed payload, optionally waiting for a release signal first.
struct StubEncoder {
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl SlideshowEncoder for StubEncoder {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn encode(
        &self,
        clips: &[SlideshowClip],
        output: &Path,
        events: EncoderEvents,
    ) -> MediaResult<()> {
        let total = total_duration_ms(clips);
        let _ = events.send(EncoderEvent::progress(STAGE_OUTPUT_TIME, total / 2, total));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let _ = events.send(EncoderEvent::progress(STAGE_OUTPUT_TIME, total, total));
        tokio::fs::write(output, VIDEO_BYTES).await?;
        Ok(())
    }
}

struct TestApp {
    router: Router,
    _dir: TempDir,
}

fn create_test_app(gate: Option<Arc<Notify>>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let worker_config = WorkerConfig {
        work_dir: dir.path().to_path_buf(),
        verify_output: false,
        ..Default::default()
    };
    let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
    let orchestrator = SlideshowOrchestrator::new(worker_config, registry)
        .with_encoder(Arc::new(StubEncoder { gate }));

    let state = AppState::with_orchestrator(ApiConfig::default(), orchestrator);
    TestApp {
        router: create_router(state, None),
        _dir: dir,
    }
}

fn png() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::from_pixel(40, 30, image::Rgb([9, 9, 9]))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, Vec<u8>),
}

fn upload_request(parts: Vec<Part<'_>>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn wait_for_status(app: &TestApp, task_id: &str, wanted: &str) -> Value {
    for _ in 0..3000 {
        let (status, json) = send_json(app, get(&format!("/status/{}", task_id))).await;
        assert_eq!(status, StatusCode::OK);
        if json["status"] == wanted {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never reached {}", task_id, wanted);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(None);

    let (status, headers, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");

    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers["x-content-type-options"], "nosniff");

    let (status, _, _) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app(None);
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let (_, headers, _) = send(&app, request).await;
    assert_eq!(headers["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_metrics_disabled() {
    let app = create_test_app(None);
    let (status, _, _) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_task_status_is_404() {
    let app = create_test_app(None);
    let (status, json) = send_json(&app, get("/status/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Task not found");
}

#[tokio::test]
async fn test_unknown_task_download_is_400() {
    let app = create_test_app(None);
    let (status, json) = send_json(&app, get("/download/does-not-exist")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "File not ready");
}

#[tokio::test]
async fn test_upload_without_images_is_rejected() {
    let app = create_test_app(None);

    let (status, json) = send_json(&app, upload_request(vec![Part::Text("title", "t")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "No valid images were uploaded");

    // empty uploads do not count
    let (status, _) = send_json(
        &app,
        upload_request(vec![Part::File("a.png", Vec::new()), Part::Text("title", "t")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_validates_form() {
    let app = create_test_app(None);

    let (status, _) = send_json(
        &app,
        upload_request(vec![
            Part::File("a.png", png()),
            Part::Text("title", "t"),
            Part::Text("duration", "0"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        upload_request(vec![
            Part::File("a.png", png()),
            Part::Text("title", "t"),
            Part::Text("duration", "soon"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send_json(&app, upload_request(vec![Part::File("a.png", png())])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "title is required");
}

#[tokio::test]
async fn test_upload_poll_and_download() {
    let app = create_test_app(None);

    let (status, json) = send_json(
        &app,
        upload_request(vec![
            Part::File("a.png", png()),
            Part::File("b.png", png()),
            Part::Text("title", "My:Video?"),
            Part::Text("duration", "1.5"),
            Part::Text("resolution", "landscape"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = json["task_id"].as_str().unwrap().to_string();

    let done = wait_for_status(&app, &task_id, "completed").await;
    assert_eq!(done["percent"], 100);
    assert_eq!(done["msg"], "done");
    assert_eq!(done["filename"], "MyVideo.mp4");
    assert_eq!(done["result"], format!("/download/{}", task_id));

    let (status, headers, body) = send(&app, get(&format!("/download/{}", task_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        VIDEO_BYTES.len().to_string().as_str()
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"MyVideo.mp4\""
    );
    assert_eq!(body, VIDEO_BYTES);
}

#[tokio::test]
async fn test_download_before_completion_is_400() {
    let gate = Arc::new(Notify::new());
    let app = create_test_app(Some(gate.clone()));

    let (status, json) = send_json(
        &app,
        upload_request(vec![Part::File("a.png", png()), Part::Text("title", "slow")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = json["task_id"].as_str().unwrap().to_string();

    let (status, json) = send_json(&app, get(&format!("/status/{}", task_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "processing");
    assert!(json.get("result").is_none());

    let (status, _) = send_json(&app, get(&format!("/download/{}", task_id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    gate.notify_one();
    wait_for_status(&app, &task_id, "completed").await;
}

#[tokio::test]
async fn test_failed_job_reports_error() {
    let app = create_test_app(None);

    let (_, json) = send_json(
        &app,
        upload_request(vec![
            Part::File("a.png", b"garbage".to_vec()),
            Part::Text("title", "bad"),
        ]),
    )
    .await;
    let task_id = json["task_id"].as_str().unwrap().to_string();

    let failed = wait_for_status(&app, &task_id, "failed").await;
    assert!(failed["error"].as_str().unwrap().contains("Image 1"));
    assert!(failed.get("result").is_none());

    let (status, _) = send_json(&app, get(&format!("/download/{}", task_id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
