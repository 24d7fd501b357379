//! Domain types for the DreamMesh generation service.
//!
//! Pure data and validation logic shared by the pipeline seam and the API
//! server. No I/O lives here.

pub mod error;
pub mod params;
pub mod task;
