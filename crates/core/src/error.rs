/// Domain-level error taxonomy.
///
/// Submission-time failures are surfaced synchronously through these
/// variants; failures inside a running job are recorded on the task record
/// instead and never reach the submitting caller.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested input modality is not enabled on this deployment.
    #[error("{0}")]
    FeatureDisabled(String),

    /// Malformed prompt, parameters, or image payload.
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown task identifier or missing backing artifact.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Artifact requested before the task reached `completed`.
    #[error("{0}")]
    NotReady(String),

    /// Anything unexpected during submission.
    #[error("Internal error: {0}")]
    Internal(String),
}
