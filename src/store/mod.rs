/// Snapshot persistence abstraction.
///
/// The engine's export/import (snapshot module) is the only serialization
/// path; a SnapshotStore only moves those documents to and from a backing
/// medium. Loads return raw JSON values so the engine's import validation
/// stays the single source of truth.

use async_trait::async_trait;

use crate::errors::RecError;
use crate::snapshot::LearnerSnapshot;

pub mod jsonfile;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one learner snapshot, replacing any previous one.
    async fn save(&self, snapshot: &LearnerSnapshot) -> Result<(), RecError>;

    /// Load one learner's raw snapshot document.
    async fn load(&self, learner_id: &str) -> Result<serde_json::Value, RecError>;

    /// Persist a whole registry export.
    async fn save_all(&self, snapshots: &[LearnerSnapshot]) -> Result<(), RecError>;

    /// Load every stored snapshot document.
    async fn load_all(&self) -> Result<Vec<serde_json::Value>, RecError>;

    /// Ids of all stored learners, sorted.
    async fn list(&self) -> Result<Vec<String>, RecError>;

    /// Remove one learner's snapshot. Unknown ids are not an error.
    async fn delete(&self, learner_id: &str) -> Result<(), RecError>;
}
