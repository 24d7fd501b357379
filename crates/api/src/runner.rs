//! Background job runner.
//!
//! One detached task per submitted job, executing the fixed three-stage
//! pipeline (optional text→image, image→shape + cleanup, texture) and
//! writing progress into the [`TaskStore`]. Jobs are fire-and-forget from
//! the gateway's perspective: the submitting request never awaits them and
//! client disconnects do not cancel them. A [`TaskTracker`] keeps
//! completion observable for graceful shutdown and tests.
//!
//! Pipeline invocations are serialized through a semaphore because the
//! external pipelines are not assumed safe for concurrent invocation; the
//! default width of 1 means one job computes at a time per process.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use dreammesh_core::params::GenerationParams;
use dreammesh_core::task::{TaskId, TaskState};
use dreammesh_pipeline::{Mesh, PipelineError, PipelineSet};

use crate::files::FileMaterializer;
use crate::store::TaskStore;

/// Input modality of one job.
pub enum JobInput {
    /// Prompt for the text→image stage.
    Text(String),
    /// Decoded upload; background removal runs for alpha-less images.
    Image(DynamicImage),
}

impl JobInput {
    fn initial_message(&self) -> &'static str {
        match self {
            JobInput::Text(_) => "Generating 3D from text...",
            JobInput::Image(_) => "Generating 3D from image...",
        }
    }
}

/// Spawns and tracks background generation jobs.
#[derive(Clone)]
pub struct JobRunner {
    store: TaskStore,
    pipelines: Arc<PipelineSet>,
    materializer: FileMaterializer,
    pipeline_slots: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl JobRunner {
    pub fn new(
        store: TaskStore,
        pipelines: Arc<PipelineSet>,
        materializer: FileMaterializer,
        pipeline_concurrency: usize,
    ) -> Self {
        Self {
            store,
            pipelines,
            materializer,
            pipeline_slots: Arc::new(Semaphore::new(pipeline_concurrency)),
            tracker: TaskTracker::new(),
        }
    }

    /// Tracker over all spawned jobs, used for orderly shutdown
    /// (`close()` + `wait()`).
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Launch the job for `id` and return immediately.
    ///
    /// The caller must have seeded the task record first. The returned
    /// handle is informational; nothing in the request path awaits it.
    pub fn spawn(&self, id: TaskId, input: JobInput, params: GenerationParams) -> JoinHandle<()> {
        let runner = self.clone();
        self.tracker.spawn(async move {
            if let Err(e) = runner.execute(id, input, params).await {
                tracing::error!(task_id = %id, error = %e, "Generation failed");
                runner
                    .store
                    .transition(
                        id,
                        TaskState::Error {
                            error: e.to_string(),
                        },
                    )
                    .await;
            }
        })
    }

    async fn execute(
        &self,
        id: TaskId,
        input: JobInput,
        params: GenerationParams,
    ) -> Result<(), PipelineError> {
        self.store
            .transition(
                id,
                TaskState::Processing {
                    message: input.initial_message().to_string(),
                },
            )
            .await;

        // Serialize access to the compute-heavy stages.
        let _permit = self
            .pipeline_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Backend("pipeline worker pool closed".to_string()))?;

        let started = Instant::now();

        // Stage 1: obtain the reference image.
        let image = match input {
            JobInput::Text(prompt) => {
                let t2i = self.pipelines.text_to_image.as_ref().ok_or_else(|| {
                    PipelineError::Backend("text-to-image pipeline not loaded".to_string())
                })?;
                t2i.generate(&prompt, params.seed).await?
            }
            JobInput::Image(image) => {
                // Background removal only applies to opaque inputs; images
                // uploaded with an alpha channel are taken as pre-matted.
                // Either way the pipeline receives RGBA.
                let image = if image.color().has_alpha() {
                    image
                } else {
                    self.pipelines
                        .background_remover
                        .remove_background(image)
                        .await?
                };
                image.to_rgba8()
            }
        };

        // Stage 2: shape synthesis and mesh cleanup.
        self.progress(id, "Synthesizing shape...").await;
        let mesh = self.pipelines.shape.generate(&image, &params).await?;
        let mesh = self.pipelines.cleanup.remove_floaters(mesh).await?;
        let mesh = self.pipelines.cleanup.remove_degenerate_faces(mesh).await?;
        let mesh = self.pipelines.cleanup.reduce_faces(mesh).await?;
        let shape_secs = started.elapsed().as_secs_f64();
        tracing::info!(task_id = %id, shape_secs, "Shape generation completed");

        // Stage 3: texture synthesis, when requested.
        let mesh: Mesh = if params.enable_texture {
            self.progress(id, "Applying texture...").await;
            let texture_started = Instant::now();
            let textured = self.pipelines.texture.apply(mesh, &image).await?;
            let texture_secs = texture_started.elapsed().as_secs_f64();
            tracing::info!(task_id = %id, texture_secs, "Texture generation completed");
            textured
        } else {
            mesh
        };

        let suffix = mesh.file_type();
        let file_path = self.materializer.persist(mesh.into_bytes(), suffix).await?;

        let total_secs = started.elapsed().as_secs_f64();
        tracing::info!(
            task_id = %id,
            total_secs,
            file_path = %file_path.display(),
            "Generation completed",
        );

        self.store
            .transition(
                id,
                TaskState::Completed {
                    message: "Generation completed successfully".to_string(),
                    file_path,
                    download_url: format!("/download/{id}"),
                },
            )
            .await;

        Ok(())
    }

    /// Refresh the processing message so pollers observe stage boundaries.
    async fn progress(&self, id: TaskId, message: &str) {
        self.store
            .transition(
                id,
                TaskState::Processing {
                    message: message.to_string(),
                },
            )
            .await;
    }
}
