//! Handlers for the bundled web interface.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use dreammesh_core::error::CoreError;

use crate::error::AppResult;
use crate::state::AppState;

/// GET / -- serve the main web interface from the template directory.
pub async fn index(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let path = state.config.template_dir.join("index.html");
    let html = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Index template missing");
        CoreError::NotFound {
            entity: "Page",
            id: "index.html".to_string(),
        }
    })?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html))
}
