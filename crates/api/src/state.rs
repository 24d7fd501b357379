use std::sync::Arc;

use dreammesh_pipeline::PipelineSet;

use crate::config::ServerConfig;
use crate::runner::JobRunner;
use crate::store::TaskStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
/// Constructed explicitly at startup and in tests, so fake pipelines can be
/// injected without process-wide globals.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, resolved once at startup.
    pub config: Arc<ServerConfig>,
    /// In-memory task records.
    pub store: TaskStore,
    /// Spawns background generation jobs.
    pub runner: JobRunner,
    /// Loaded pipeline singletons (also held by the runner).
    pub pipelines: Arc<PipelineSet>,
}
