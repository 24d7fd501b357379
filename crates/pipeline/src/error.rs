/// Failure of an external pipeline stage.
///
/// These never reach the submitting HTTP caller; the job runner records
/// them on the task record where pollers observe them.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The backend rejected or failed the stage.
    #[error("{0}")]
    Backend(String),

    /// Filesystem failure while persisting or reading artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
