//! Task identifiers and the per-task state machine.
//!
//! A task moves along `pending → processing → {completed | error}` and never
//! leaves a terminal state. Each variant carries only the fields valid for
//! that state, so an error message can never coexist with a file path.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Task identifier
// ---------------------------------------------------------------------------

/// Opaque unique task identifier, allocated once at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters of the canonical form, used in download
    /// filenames (`demo_<short>.glb`).
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// State of one generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Created, runner not yet started work.
    Pending,
    /// Runner is executing; `message` names the current stage.
    Processing { message: String },
    /// Artifact persisted and ready to serve.
    Completed {
        message: String,
        file_path: PathBuf,
        download_url: String,
    },
    /// A pipeline stage failed; the job is never retried.
    Error { error: String },
}

impl TaskState {
    /// Wire name of the state, as exposed by the status endpoint.
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Processing { .. } => "processing",
            TaskState::Completed { .. } => "completed",
            TaskState::Error { .. } => "error",
        }
    }

    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed { .. } | TaskState::Error { .. })
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Processing → Processing` is allowed so the runner can refresh the
    /// stage message; everything else follows the monotonic chain.
    pub fn can_transition(&self, next: &TaskState) -> bool {
        match (self, next) {
            (TaskState::Pending, TaskState::Processing { .. }) => true,
            (TaskState::Processing { .. }, TaskState::Processing { .. }) => true,
            (TaskState::Processing { .. }, TaskState::Completed { .. }) => true,
            (TaskState::Processing { .. }, TaskState::Error { .. }) => true,
            _ => false,
        }
    }
}
