pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /text-to-3d             submit text job (POST)
/// /image-to-3d            submit image job (POST, multipart)
/// /status/{task_id}       poll task state
/// /view/{task_id}         artifact, inline
/// /download/{task_id}     artifact, attachment
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/text-to-3d", post(handlers::generation::text_to_3d))
        .route("/image-to-3d", post(handlers::generation::image_to_3d))
        .route("/status/{task_id}", get(handlers::generation::get_status))
        .route("/view/{task_id}", get(handlers::generation::view_model))
        .route(
            "/download/{task_id}",
            get(handlers::generation::download_model),
        )
}
