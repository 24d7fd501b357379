//! Deterministic in-process pipeline backend.
//!
//! Stands in for the real generative models: every stage completes
//! instantly and the shape stage emits a minimal but structurally valid
//! binary glTF (GLB) container whose content is a pure function of the
//! input image and parameters. Used by the default server wiring and by
//! the API integration tests.

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};

use dreammesh_core::params::GenerationParams;

use crate::{
    BackgroundRemover, Mesh, MeshCleanup, PipelineError, ShapeGenerator, TextToImage,
    TexturePipeline,
};

/// GLB container magic (`glTF`).
const GLB_MAGIC: u32 = 0x4654_6C67;
/// GLB container version.
const GLB_VERSION: u32 = 2;
/// JSON chunk type tag.
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;

/// Side length of images synthesized by [`StubTextToImage`].
const STUB_IMAGE_SIZE: u32 = 64;

/// FNV-1a over arbitrary bytes; all stub determinism derives from this.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Encode a minimal GLB container with the given glTF JSON document.
fn encode_glb(json: &str) -> Vec<u8> {
    // JSON chunks are padded to 4-byte alignment with spaces.
    let mut chunk = json.as_bytes().to_vec();
    while chunk.len() % 4 != 0 {
        chunk.push(b' ');
    }

    let total_len = 12 + 8 + chunk.len();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_len as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&chunk);
    out
}

// ---------------------------------------------------------------------------
// Stage implementations
// ---------------------------------------------------------------------------

/// Renders a flat-colour reference image derived from the prompt and seed.
pub struct StubTextToImage;

#[async_trait]
impl TextToImage for StubTextToImage {
    async fn generate(&self, prompt: &str, seed: u64) -> Result<RgbaImage, PipelineError> {
        let mut key = prompt.as_bytes().to_vec();
        key.extend_from_slice(&seed.to_le_bytes());
        let hash = fnv1a(&key);
        let pixel = Rgba([
            (hash & 0xFF) as u8,
            ((hash >> 8) & 0xFF) as u8,
            ((hash >> 16) & 0xFF) as u8,
            255,
        ]);
        Ok(RgbaImage::from_pixel(STUB_IMAGE_SIZE, STUB_IMAGE_SIZE, pixel))
    }
}

/// Passes the image through unchanged; matting is a model concern.
pub struct StubBackgroundRemover;

#[async_trait]
impl BackgroundRemover for StubBackgroundRemover {
    async fn remove_background(&self, image: DynamicImage) -> Result<DynamicImage, PipelineError> {
        Ok(image)
    }
}

/// Emits a placeholder GLB whose extras record the sampling inputs.
pub struct StubShapeGenerator;

#[async_trait]
impl ShapeGenerator for StubShapeGenerator {
    async fn generate(
        &self,
        image: &RgbaImage,
        params: &GenerationParams,
    ) -> Result<Mesh, PipelineError> {
        let image_hash = fnv1a(image.as_raw());
        let doc = serde_json::json!({
            "asset": { "version": "2.0", "generator": "dreammesh-stub" },
            "extras": {
                "image_hash": format!("{image_hash:016x}"),
                "seed": params.seed,
                "octree_resolution": params.octree_resolution,
                "num_inference_steps": params.num_inference_steps,
                "num_chunks": params.num_chunks,
            },
        });
        Ok(Mesh::new(encode_glb(&doc.to_string()), "glb"))
    }
}

/// Cleanup stages are no-ops on the placeholder payload.
pub struct StubMeshCleanup;

#[async_trait]
impl MeshCleanup for StubMeshCleanup {
    async fn remove_floaters(&self, mesh: Mesh) -> Result<Mesh, PipelineError> {
        Ok(mesh)
    }

    async fn remove_degenerate_faces(&self, mesh: Mesh) -> Result<Mesh, PipelineError> {
        Ok(mesh)
    }

    async fn reduce_faces(&self, mesh: Mesh) -> Result<Mesh, PipelineError> {
        Ok(mesh)
    }
}

/// Texturing keeps the payload unchanged.
pub struct StubTexturePipeline;

#[async_trait]
impl TexturePipeline for StubTexturePipeline {
    async fn apply(&self, mesh: Mesh, _image: &RgbaImage) -> Result<Mesh, PipelineError> {
        Ok(mesh)
    }
}
