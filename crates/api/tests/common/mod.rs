//! Shared helpers for API integration tests.
//!
//! Builds the full application router (same middleware stack as
//! production) around stub or fault-injecting pipelines and a temporary
//! output directory.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::RgbaImage;
use tempfile::TempDir;
use tower::ServiceExt;

use dreammesh_api::config::ServerConfig;
use dreammesh_api::files::FileMaterializer;
use dreammesh_api::router::build_app_router;
use dreammesh_api::runner::JobRunner;
use dreammesh_api::state::AppState;
use dreammesh_api::store::TaskStore;
use dreammesh_core::params::GenerationParams;
use dreammesh_pipeline::{stub, Mesh, PipelineError, PipelineSet, ShapeGenerator};

/// Multipart boundary used by [`post_multipart`].
pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// A router plus the temporary output directory backing it.
///
/// Keep the struct alive for the duration of the test; dropping it deletes
/// the output directory.
pub struct TestApp {
    pub router: Router,
    pub outputs: TempDir,
}

/// Build a test `ServerConfig` rooted in a temp directory.
pub fn test_config(outputs: &TempDir) -> ServerConfig {
    let root = outputs.path();
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        device: "cpu".to_string(),
        model_path: "test/shape-model".to_string(),
        subfolder: "main".to_string(),
        tex_model_path: "test/texture-model".to_string(),
        enable_t23d: true,
        enable_flashvdm: false,
        low_vram_mode: false,
        save_dir: root.join("outputs"),
        log_dir: root.join("logs"),
        template_dir: root.join("templates"),
        static_dir: root.join("static"),
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        max_output_files: 100,
        pipeline_concurrency: 1,
    }
}

/// The full deterministic stub pipeline bundle.
pub fn stub_pipelines() -> PipelineSet {
    PipelineSet {
        text_to_image: Some(Arc::new(stub::StubTextToImage)),
        background_remover: Arc::new(stub::StubBackgroundRemover),
        shape: Arc::new(stub::StubShapeGenerator),
        cleanup: Arc::new(stub::StubMeshCleanup),
        texture: Arc::new(stub::StubTexturePipeline),
    }
}

/// Build the application with the default stub pipelines.
pub fn build_test_app() -> TestApp {
    build_test_app_with(stub_pipelines())
}

/// Build the application around an arbitrary pipeline bundle.
///
/// This mirrors the wiring in `main.rs` so integration tests exercise the
/// same middleware stack (CORS, request ID, timeout, panic recovery) that
/// production uses.
pub fn build_test_app_with(pipelines: PipelineSet) -> TestApp {
    let outputs = tempfile::tempdir().expect("failed to create temp dir");
    let config = test_config(&outputs);
    config.create_dirs().expect("failed to create test dirs");

    let pipelines = Arc::new(pipelines);
    let store = TaskStore::new();
    let materializer = FileMaterializer::new(config.save_dir.clone(), config.max_output_files);
    let runner = JobRunner::new(
        store.clone(),
        Arc::clone(&pipelines),
        materializer,
        config.pipeline_concurrency,
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        runner,
        pipelines,
    };

    TestApp {
        router: build_app_router(state, &config),
        outputs,
    }
}

// ---------------------------------------------------------------------------
// Fault-injecting pipeline stages
// ---------------------------------------------------------------------------

/// Shape stage that always fails with a fixed backend error.
pub struct FailingShape;

#[async_trait]
impl ShapeGenerator for FailingShape {
    async fn generate(
        &self,
        _image: &RgbaImage,
        _params: &GenerationParams,
    ) -> Result<Mesh, PipelineError> {
        Err(PipelineError::Backend("shape sampling diverged".to_string()))
    }
}

/// Shape stage that never completes, pinning its task in `processing`.
pub struct StalledShape;

#[async_trait]
impl ShapeGenerator for StalledShape {
    async fn generate(
        &self,
        _image: &RgbaImage,
        _params: &GenerationParams,
    ) -> Result<Mesh, PipelineError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

/// Stub bundle with the shape stage replaced.
pub fn pipelines_with_shape(shape: Arc<dyn ShapeGenerator>) -> PipelineSet {
    PipelineSet {
        shape,
        ..stub_pipelines()
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Issue a GET request against a clone of the app.
pub async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Issue a JSON POST request against a clone of the app.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Issue a multipart POST with a single `image` file part and optional
/// extra form fields.
pub async fn post_multipart(
    app: &Router,
    uri: &str,
    file_content_type: &str,
    file_bytes: &[u8],
    extra_fields: &[(&str, &str)],
) -> axum::response::Response {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"image\"; filename=\"upload.png\"\r\n\
             Content-Type: {file_content_type}\r\n\r\n",
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    for (name, value) in extra_fields {
        body.extend_from_slice(
            format!(
                "\r\n--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}",
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body was not valid JSON")
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Poll the status endpoint until the task reaches a terminal state.
pub async fn wait_for_terminal(app: &Router, task_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app, &format!("/api/v1/status/{task_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        match json["status"].as_str() {
            Some("completed") | Some("error") => return json,
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    panic!("task {task_id} never reached a terminal state");
}

/// A small valid PNG with an alpha channel for upload tests.
pub fn png_bytes() -> Vec<u8> {
    let image = RgbaImage::from_pixel(8, 8, image::Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode test PNG");
    out.into_inner()
}

/// A small valid PNG without an alpha channel, to exercise the
/// background-removal path.
pub fn opaque_png_bytes() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(8, 8, image::Rgb([40, 200, 40]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode test PNG");
    out.into_inner()
}
