//! The seam between the task orchestrator and the generative-model
//! pipelines.
//!
//! Inference is an opaque external collaborator: each stage of the
//! text→image→shape→texture chain is a trait object, loaded once at startup
//! and shared read-mostly across all jobs. Implementations own their
//! threading; CPU/GPU-bound backends must offload heavy work (e.g. via
//! `tokio::task::spawn_blocking`) rather than block the async executor.
//!
//! The crate ships a single deterministic in-process backend ([`stub`])
//! that produces minimal valid GLB containers. It keeps the server and its
//! tests runnable without model weights and marks the integration point for
//! a real inference backend.

pub mod error;
pub mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};

use dreammesh_core::params::GenerationParams;

pub use error::PipelineError;

// ---------------------------------------------------------------------------
// Mesh payload
// ---------------------------------------------------------------------------

/// Opaque encoded mesh, produced and consumed only by pipeline stages.
///
/// The orchestrator never inspects the bytes; it only persists them with
/// the suffix the backend reports.
#[derive(Debug, Clone)]
pub struct Mesh {
    data: Vec<u8>,
    file_type: &'static str,
}

impl Mesh {
    pub fn new(data: Vec<u8>, file_type: &'static str) -> Self {
        Self { data, file_type }
    }

    /// File suffix for the encoded representation (e.g. `glb`).
    pub fn file_type(&self) -> &'static str {
        self.file_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

// ---------------------------------------------------------------------------
// Stage traits
// ---------------------------------------------------------------------------

/// Stage 1 (text jobs only): synthesize a reference image from a prompt.
#[async_trait]
pub trait TextToImage: Send + Sync {
    async fn generate(&self, prompt: &str, seed: u64) -> Result<RgbaImage, PipelineError>;
}

/// Strip the background from an opaque input image.
///
/// Only invoked for uploads without an alpha channel; transparent inputs
/// are assumed to be pre-matted.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image: DynamicImage) -> Result<DynamicImage, PipelineError>;
}

/// Stage 2: sample a raw mesh from a reference image.
#[async_trait]
pub trait ShapeGenerator: Send + Sync {
    async fn generate(
        &self,
        image: &RgbaImage,
        params: &GenerationParams,
    ) -> Result<Mesh, PipelineError>;
}

/// Mesh post-processing applied between shape sampling and texturing.
#[async_trait]
pub trait MeshCleanup: Send + Sync {
    /// Drop disconnected floating fragments.
    async fn remove_floaters(&self, mesh: Mesh) -> Result<Mesh, PipelineError>;
    /// Drop zero-area and otherwise invalid faces.
    async fn remove_degenerate_faces(&self, mesh: Mesh) -> Result<Mesh, PipelineError>;
    /// Reduce the face count to the backend's target budget.
    async fn reduce_faces(&self, mesh: Mesh) -> Result<Mesh, PipelineError>;
}

/// Stage 3: synthesize a texture for the cleaned mesh.
#[async_trait]
pub trait TexturePipeline: Send + Sync {
    async fn apply(&self, mesh: Mesh, image: &RgbaImage) -> Result<Mesh, PipelineError>;
}

// ---------------------------------------------------------------------------
// Pipeline bundle
// ---------------------------------------------------------------------------

/// Backend selection and model locations, resolved from the environment by
/// the server at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Compute device selector (e.g. `cuda`, `cpu`).
    pub device: String,
    /// Shape model identifier or path.
    pub model_path: String,
    /// Variant subfolder within the shape model.
    pub subfolder: String,
    /// Texture model identifier or path.
    pub tex_model_path: String,
    /// Whether the text→image stage is available at all.
    pub enable_t23d: bool,
    /// Inference-acceleration mode for the shape pipeline.
    pub enable_flashvdm: bool,
    /// Reduced-memory mode for the texture pipeline.
    pub low_vram_mode: bool,
}

/// Process-wide bundle of loaded pipeline stages.
///
/// `text_to_image` is `None` when text input is disabled; the gateway turns
/// that into a `FeatureDisabled` rejection at submission time.
#[derive(Clone)]
pub struct PipelineSet {
    pub text_to_image: Option<Arc<dyn TextToImage>>,
    pub background_remover: Arc<dyn BackgroundRemover>,
    pub shape: Arc<dyn ShapeGenerator>,
    pub cleanup: Arc<dyn MeshCleanup>,
    pub texture: Arc<dyn TexturePipeline>,
}

impl PipelineSet {
    /// Load all pipeline stages for the configured backend.
    ///
    /// Currently wires the deterministic [`stub`] backend; a GPU inference
    /// backend plugs in here without touching the orchestrator.
    pub fn load(config: &PipelineConfig) -> Result<Self, PipelineError> {
        tracing::info!(device = %config.device, "Loading generation pipelines");

        let text_to_image: Option<Arc<dyn TextToImage>> = if config.enable_t23d {
            let t2i = stub::StubTextToImage;
            tracing::info!("Text-to-image pipeline loaded");
            Some(Arc::new(t2i))
        } else {
            tracing::info!("Text-to-image pipeline disabled (ENABLE_T23D=false)");
            None
        };

        let shape = stub::StubShapeGenerator;
        tracing::info!(
            model_path = %config.model_path,
            subfolder = %config.subfolder,
            "Shape pipeline loaded",
        );
        if config.enable_flashvdm {
            tracing::info!("FlashVDM enabled");
        }

        let texture = stub::StubTexturePipeline;
        tracing::info!(tex_model_path = %config.tex_model_path, "Texture pipeline loaded");
        if config.low_vram_mode {
            tracing::info!("Low-VRAM mode enabled for texture pipeline");
        }

        Ok(Self {
            text_to_image,
            background_remover: Arc::new(stub::StubBackgroundRemover),
            shape: Arc::new(shape),
            cleanup: Arc::new(stub::StubMeshCleanup),
            texture: Arc::new(texture),
        })
    }

    /// Whether text-to-3D submissions are accepted.
    pub fn text_enabled(&self) -> bool {
        self.text_to_image.is_some()
    }
}
