//! Handlers for the generation API: submission, polling, and artifact
//! retrieval.
//!
//! Submission-time validation errors surface synchronously as HTTP errors;
//! anything that fails after the job is spawned is only observable through
//! the status endpoint.

use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use dreammesh_core::error::CoreError;
use dreammesh_core::params::GenerationParams;
use dreammesh_core::task::{TaskId, TaskState};

use crate::error::{AppError, AppResult};
use crate::runner::JobInput;
use crate::state::AppState;

/// MIME type of the served artifacts (binary glTF).
const GLB_MEDIA_TYPE: &str = "model/gltf-binary";

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TextTo3DRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// Body returned by both submission endpoints.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
    pub status: &'static str,
    pub message: &'static str,
}

/// Flat status body exposed by `GET /status/{task_id}`.
///
/// The on-disk path stays internal; clients get the download URL instead.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskState> for StatusResponse {
    fn from(state: TaskState) -> Self {
        let status = state.name();
        match state {
            TaskState::Pending => Self {
                status,
                message: None,
                download_url: None,
                error: None,
            },
            TaskState::Processing { message } => Self {
                status,
                message: Some(message),
                download_url: None,
                error: None,
            },
            TaskState::Completed {
                message,
                download_url,
                ..
            } => Self {
                status,
                message: Some(message),
                download_url: Some(download_url),
                error: None,
            },
            TaskState::Error { error } => Self {
                status,
                message: None,
                download_url: None,
                error: Some(error),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// POST /text-to-3d
// ---------------------------------------------------------------------------

/// Submit a text-to-3D generation job.
pub async fn text_to_3d(
    State(state): State<AppState>,
    Json(request): Json<TextTo3DRequest>,
) -> AppResult<impl IntoResponse> {
    if !state.pipelines.text_enabled() {
        return Err(CoreError::FeatureDisabled(
            "Text-to-image generation is not enabled".to_string(),
        )
        .into());
    }
    if request.prompt.trim().is_empty() {
        return Err(CoreError::InvalidInput("prompt must not be empty".to_string()).into());
    }
    request.params.validate()?;

    let task_id = TaskId::new();
    state.store.create(task_id).await;
    state
        .runner
        .spawn(task_id, JobInput::Text(request.prompt), request.params);

    tracing::info!(task_id = %task_id, "Started text-to-3D generation task");

    Ok(Json(SubmitResponse {
        task_id,
        status: "processing",
        message: "Generation started",
    }))
}

// ---------------------------------------------------------------------------
// POST /image-to-3d
// ---------------------------------------------------------------------------

/// Submit an image-to-3D generation job (multipart form).
pub async fn image_to_3d(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut params = GenerationParams::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let is_image = field
                    .content_type()
                    .is_some_and(|ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(
                        CoreError::InvalidInput("Invalid image file".to_string()).into()
                    );
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
                image_bytes = Some(bytes.to_vec());
            }
            "seed" => params.seed = parse_form_field(&name, field.text().await)?,
            "octree_resolution" => {
                params.octree_resolution = parse_form_field(&name, field.text().await)?;
            }
            "num_inference_steps" => {
                params.num_inference_steps = parse_form_field(&name, field.text().await)?;
            }
            "num_chunks" => params.num_chunks = parse_form_field(&name, field.text().await)?,
            "output_type" => {
                params.output_type = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read form: {e}")))?;
            }
            "enable_texture" => {
                params.enable_texture = parse_form_field(&name, field.text().await)?;
            }
            // Unknown form fields are ignored, matching lenient form handling.
            _ => {}
        }
    }

    let Some(bytes) = image_bytes else {
        return Err(CoreError::InvalidInput("Invalid image file".to_string()).into());
    };
    params.validate()?;

    // Decoding can take a while for large uploads; keep it off the
    // request-handling scheduler.
    let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| AppError::InternalError(format!("Image decode task failed: {e}")))?
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected undecodable upload");
            AppError::from(CoreError::InvalidInput("Invalid image file".to_string()))
        })?;

    let task_id = TaskId::new();
    state.store.create(task_id).await;
    state
        .runner
        .spawn(task_id, JobInput::Image(decoded), params);

    tracing::info!(task_id = %task_id, "Started image-to-3D generation task");

    Ok(Json(SubmitResponse {
        task_id,
        status: "processing",
        message: "Generation started",
    }))
}

fn parse_form_field<T: std::str::FromStr>(
    name: &str,
    text: Result<String, axum::extract::multipart::MultipartError>,
) -> AppResult<T> {
    let text = text.map_err(|e| AppError::BadRequest(format!("Failed to read form: {e}")))?;
    text.trim()
        .parse()
        .map_err(|_| CoreError::InvalidInput(format!("Invalid value for {name}")).into())
}

// ---------------------------------------------------------------------------
// GET /status/{task_id}
// ---------------------------------------------------------------------------

/// Poll the state of a generation task.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_task_id(&task_id)?;
    let record = state.store.get(id).await.ok_or(CoreError::NotFound {
        entity: "Task",
        id: task_id,
    })?;
    Ok(Json(StatusResponse::from(record)))
}

// ---------------------------------------------------------------------------
// GET /view/{task_id}
// ---------------------------------------------------------------------------

/// Return the artifact inline, for in-browser rendering.
pub async fn view_model(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (bytes, _path, _id) = load_artifact(&state, &task_id).await?;
    Ok((
        [
            (axum::http::header::CONTENT_TYPE, GLB_MEDIA_TYPE.to_string()),
            (
                axum::http::header::CONTENT_DISPOSITION,
                "inline".to_string(),
            ),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// GET /download/{task_id}
// ---------------------------------------------------------------------------

/// Return the artifact as an attachment named `demo_<short-id>.<ext>`.
pub async fn download_model(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (bytes, path, id) = load_artifact(&state, &task_id).await?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("glb")
        .to_string();
    Ok((
        [
            (axum::http::header::CONTENT_TYPE, GLB_MEDIA_TYPE.to_string()),
            (
                axum::http::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"demo_{}.{ext}\"", id.short()),
            ),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_task_id(raw: &str) -> AppResult<TaskId> {
    raw.parse().map_err(|_| {
        AppError::from(CoreError::NotFound {
            entity: "Task",
            id: raw.to_string(),
        })
    })
}

/// Resolve a completed task's artifact bytes.
///
/// Fails `NotReady` before completion and `NotFound` when the record points
/// at a file that no longer exists on disk (orphaned by retention or manual
/// deletion).
async fn load_artifact(
    state: &AppState,
    task_id: &str,
) -> AppResult<(Vec<u8>, PathBuf, TaskId)> {
    let id = parse_task_id(task_id)?;
    let record = state.store.get(id).await.ok_or(CoreError::NotFound {
        entity: "Task",
        id: task_id.to_string(),
    })?;

    let TaskState::Completed { file_path, .. } = record else {
        return Err(CoreError::NotReady("File not ready".to_string()).into());
    };

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => Ok((bytes, file_path, id)),
        Err(e) => {
            tracing::warn!(
                task_id = %id,
                file_path = %file_path.display(),
                error = %e,
                "Completed task has no backing artifact",
            );
            Err(CoreError::NotFound {
                entity: "File",
                id: file_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| task_id.to_string()),
            }
            .into())
        }
    }
}
