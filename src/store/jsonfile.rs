/// File-backed snapshot store: one `<learner_id>.json` per learner under a
/// root directory.
///
/// Learner ids are sanitized into filenames (anything outside
/// [A-Za-z0-9._-] becomes '_'); the real id lives inside the document, so a
/// filename collision at worst overwrites a sibling snapshot. Writes go
/// through a temp file and rename so readers never see a half-written
/// document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::SnapshotStore;
use crate::errors::RecError;
use crate::snapshot::LearnerSnapshot;

pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RecError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(JsonFileStore { root })
    }

    fn path_for(&self, learner_id: &str) -> PathBuf {
        let safe: String = learner_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", safe))
    }

    async fn write_document(&self, path: &Path, contents: &str) -> Result<(), RecError> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, snapshot: &LearnerSnapshot) -> Result<(), RecError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| RecError::Storage(e.to_string()))?;
        let path = self.path_for(&snapshot.learner_id);
        self.write_document(&path, &json).await?;
        tracing::debug!(learner_id = %snapshot.learner_id, path = %path.display(), "Snapshot saved");
        Ok(())
    }

    async fn load(&self, learner_id: &str) -> Result<serde_json::Value, RecError> {
        let path = self.path_for(learner_id);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| RecError::UnknownLearner(learner_id.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| RecError::Storage(e.to_string()))
    }

    async fn save_all(&self, snapshots: &[LearnerSnapshot]) -> Result<(), RecError> {
        for snapshot in snapshots {
            self.save(snapshot).await?;
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<serde_json::Value>, RecError> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();
        for path in paths {
            let raw = tokio::fs::read_to_string(&path).await?;
            let value =
                serde_json::from_str(&raw).map_err(|e| RecError::Storage(e.to_string()))?;
            out.push(value);
        }
        Ok(out)
    }

    async fn list(&self) -> Result<Vec<String>, RecError> {
        let documents = self.load_all().await?;
        let mut ids: Vec<String> = documents
            .iter()
            .filter_map(|doc| doc.get("learner_id").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, learner_id: &str) -> Result<(), RecError> {
        let path = self.path_for(learner_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
