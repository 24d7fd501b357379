//! Generation parameters shared by the text and image submission paths.

use serde::Deserialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default RNG seed for shape sampling.
pub const DEFAULT_SEED: u64 = 0;
/// Default octree resolution for the shape pipeline.
pub const DEFAULT_OCTREE_RESOLUTION: u32 = 380;
/// Default number of diffusion inference steps.
pub const DEFAULT_INFERENCE_STEPS: u32 = 50;
/// Default chunking factor for volume decoding.
pub const DEFAULT_NUM_CHUNKS: u32 = 20_000;
/// Default backend output representation.
pub const DEFAULT_OUTPUT_TYPE: &str = "trimesh";

/// Upper bound on octree resolution accepted from clients.
pub const MAX_OCTREE_RESOLUTION: u32 = 1024;
/// Upper bound on inference steps accepted from clients.
pub const MAX_INFERENCE_STEPS: u32 = 200;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Immutable configuration for one generation job, passed unchanged into
/// the external pipeline calls.
///
/// Field defaults match the service's historical HTTP contract, so a bare
/// `{}` (or an empty multipart form) is a valid parameter set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub seed: u64,
    pub octree_resolution: u32,
    pub num_inference_steps: u32,
    pub num_chunks: u32,
    pub output_type: String,
    pub enable_texture: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            octree_resolution: DEFAULT_OCTREE_RESOLUTION,
            num_inference_steps: DEFAULT_INFERENCE_STEPS,
            num_chunks: DEFAULT_NUM_CHUNKS,
            output_type: DEFAULT_OUTPUT_TYPE.to_string(),
            enable_texture: true,
        }
    }
}

impl GenerationParams {
    /// Reject parameter sets the pipelines cannot execute.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.octree_resolution == 0 || self.octree_resolution > MAX_OCTREE_RESOLUTION {
            return Err(CoreError::InvalidInput(format!(
                "octree_resolution must be between 1 and {MAX_OCTREE_RESOLUTION}",
            )));
        }
        if self.num_inference_steps == 0 || self.num_inference_steps > MAX_INFERENCE_STEPS {
            return Err(CoreError::InvalidInput(format!(
                "num_inference_steps must be between 1 and {MAX_INFERENCE_STEPS}",
            )));
        }
        if self.num_chunks == 0 {
            return Err(CoreError::InvalidInput(
                "num_chunks must be greater than zero".to_string(),
            ));
        }
        if self.output_type.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "output_type must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::CoreError;

    #[test]
    fn defaults_match_service_contract() {
        let params = GenerationParams::default();
        assert_eq!(params.seed, 0);
        assert_eq!(params.octree_resolution, 380);
        assert_eq!(params.num_inference_steps, 50);
        assert_eq!(params.num_chunks, 20_000);
        assert_eq!(params.output_type, "trimesh");
        assert!(params.enable_texture);
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let params: GenerationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.octree_resolution, DEFAULT_OCTREE_RESOLUTION);
    }

    #[test]
    fn default_params_validate() {
        assert!(GenerationParams::default().validate().is_ok());
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let params = GenerationParams {
            octree_resolution: 0,
            ..Default::default()
        };
        assert_matches!(params.validate(), Err(CoreError::InvalidInput(_)));
    }

    #[test]
    fn oversized_steps_are_rejected() {
        let params = GenerationParams {
            num_inference_steps: MAX_INFERENCE_STEPS + 1,
            ..Default::default()
        };
        assert_matches!(params.validate(), Err(CoreError::InvalidInput(_)));
    }

    #[test]
    fn blank_output_type_is_rejected() {
        let params = GenerationParams {
            output_type: "  ".to_string(),
            ..Default::default()
        };
        assert_matches!(params.validate(), Err(CoreError::InvalidInput(_)));
    }
}
