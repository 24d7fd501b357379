//! In-memory task store.
//!
//! The only cross-task shared mutable state in the process. Volatile by
//! design: records are lost on restart and never deleted while running.
//! Whole-store locking is acceptable at this contention level; updates are
//! atomic, so readers never observe a partially merged record.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use dreammesh_core::task::{TaskId, TaskState};

/// Thread-safe mapping of task identifier to task state.
///
/// The gateway creates and reads records; after creation, the owning job
/// runner is the only writer.
#[derive(Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, TaskState>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh record in `Pending`.
    pub async fn create(&self, id: TaskId) {
        let mut tasks = self.tasks.write().await;
        let previous = tasks.insert(id, TaskState::Pending);
        debug_assert!(previous.is_none(), "task id collision");
    }

    /// Advance a record to `next`.
    ///
    /// The record must exist and the transition must be legal; anything
    /// else indicates a runner bug and is logged and refused rather than
    /// corrupting the record. Returns whether the transition was applied.
    pub async fn transition(&self, id: TaskId, next: TaskState) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(current) if current.can_transition(&next) => {
                *current = next;
                true
            }
            Some(current) => {
                tracing::warn!(
                    task_id = %id,
                    from = current.name(),
                    to = next.name(),
                    "Refusing illegal task state transition",
                );
                false
            }
            None => {
                tracing::warn!(task_id = %id, "Transition for unknown task");
                false
            }
        }
    }

    /// Snapshot of a record, or `None` if the identifier was never issued.
    pub async fn get(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.read().await.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn processing(msg: &str) -> TaskState {
        TaskState::Processing {
            message: msg.to_string(),
        }
    }

    fn completed() -> TaskState {
        TaskState::Completed {
            message: "Generation completed successfully".to_string(),
            file_path: PathBuf::from("/outputs/a.glb"),
            download_url: "/download/a".to_string(),
        }
    }

    #[tokio::test]
    async fn created_tasks_start_pending() {
        let store = TaskStore::new();
        let id = TaskId::new();
        store.create(id).await;
        assert_eq!(store.get(id).await, Some(TaskState::Pending));
    }

    #[tokio::test]
    async fn unknown_ids_return_none() {
        let store = TaskStore::new();
        assert_eq!(store.get(TaskId::new()).await, None);
    }

    #[tokio::test]
    async fn full_lifecycle_applies_in_order() {
        let store = TaskStore::new();
        let id = TaskId::new();
        store.create(id).await;

        assert!(store.transition(id, processing("stage 1")).await);
        assert!(store.transition(id, processing("stage 2")).await);
        assert!(store.transition(id, completed()).await);
        assert_eq!(store.get(id).await.unwrap().name(), "completed");
    }

    #[tokio::test]
    async fn terminal_records_are_immutable() {
        let store = TaskStore::new();
        let id = TaskId::new();
        store.create(id).await;
        store.transition(id, processing("working")).await;
        store
            .transition(
                id,
                TaskState::Error {
                    error: "boom".to_string(),
                },
            )
            .await;

        assert!(!store.transition(id, completed()).await);
        assert!(!store.transition(id, processing("again")).await);
        assert_eq!(store.get(id).await.unwrap().name(), "error");
    }

    #[tokio::test]
    async fn pending_cannot_skip_processing() {
        let store = TaskStore::new();
        let id = TaskId::new();
        store.create(id).await;
        assert!(!store.transition(id, completed()).await);
        assert_eq!(store.get(id).await, Some(TaskState::Pending));
    }

    #[tokio::test]
    async fn transition_on_unknown_task_is_refused() {
        let store = TaskStore::new();
        assert!(!store.transition(TaskId::new(), processing("x")).await);
    }

    #[tokio::test]
    async fn tasks_do_not_cross_contaminate() {
        let store = TaskStore::new();
        let a = TaskId::new();
        let b = TaskId::new();
        store.create(a).await;
        store.create(b).await;

        store.transition(a, processing("a works")).await;
        assert_eq!(store.get(b).await, Some(TaskState::Pending));
        assert_eq!(store.get(a).await.unwrap().name(), "processing");
    }
}
