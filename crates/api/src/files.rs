//! Artifact persistence and best-effort retention.

use std::path::PathBuf;
use std::time::SystemTime;

use uuid::Uuid;

/// Writes finished artifacts under the configured output directory and
/// enforces a best-effort cap on how many files accumulate there.
#[derive(Debug, Clone)]
pub struct FileMaterializer {
    output_dir: PathBuf,
    max_files: usize,
}

impl FileMaterializer {
    pub fn new(output_dir: PathBuf, max_files: usize) -> Self {
        Self {
            output_dir,
            max_files,
        }
    }

    /// Persist an artifact under a freshly generated unique name and return
    /// the path for storage in the task record.
    pub async fn persist(&self, bytes: Vec<u8>, suffix: &str) -> std::io::Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.{suffix}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Delete the oldest files (by modification time) past `max_files`.
    ///
    /// Retention is peripheral: every failure is logged and swallowed, and
    /// the count of successfully deleted files is returned.
    pub async fn sweep(&self) -> usize {
        let mut entries: Vec<(PathBuf, SystemTime)> = Vec::new();

        let mut dir = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(
                    dir = %self.output_dir.display(),
                    error = %e,
                    "Retention: cannot read output directory",
                );
                return 0;
            }
        };

        while let Ok(Some(entry)) = dir.next_entry().await {
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => {
                    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    entries.push((entry.path(), modified));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Retention: cannot stat file",
                    );
                }
            }
        }

        if entries.len() <= self.max_files {
            return 0;
        }

        entries.sort_by_key(|(_, modified)| *modified);
        let excess = entries.len() - self.max_files;

        let mut deleted = 0;
        for (path, _) in entries.into_iter().take(excess) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Retention: failed to delete file",
                    );
                }
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn persist_writes_unique_files_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = FileMaterializer::new(dir.path().to_path_buf(), 100);

        let a = materializer.persist(b"aaa".to_vec(), "glb").await.unwrap();
        let b = materializer.persist(b"bbb".to_vec(), "glb").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "glb");
        assert_eq!(std::fs::read(&a).unwrap(), b"aaa");
        assert_eq!(std::fs::read(&b).unwrap(), b"bbb");
    }

    #[tokio::test]
    async fn sweep_deletes_oldest_past_cap() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = FileMaterializer::new(dir.path().to_path_buf(), 2);

        let mut paths = Vec::new();
        for i in 0..4 {
            let path = materializer
                .persist(format!("file {i}").into_bytes(), "glb")
                .await
                .unwrap();
            paths.push(path);
            // Space out modification times so age ordering is unambiguous.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let deleted = materializer.sweep().await;
        assert_eq!(deleted, 2);

        // The two oldest are gone, the two newest remain.
        assert!(!paths[0].exists());
        assert!(!paths[1].exists());
        assert!(paths[2].exists());
        assert!(paths[3].exists());
    }

    #[tokio::test]
    async fn sweep_under_cap_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = FileMaterializer::new(dir.path().to_path_buf(), 10);
        materializer.persist(b"x".to_vec(), "glb").await.unwrap();

        assert_eq!(materializer.sweep().await, 0);
    }

    #[tokio::test]
    async fn sweep_on_missing_directory_is_swallowed() {
        let materializer = FileMaterializer::new(PathBuf::from("/nonexistent/outputs"), 10);
        assert_eq!(materializer.sweep().await, 0);
    }
}
