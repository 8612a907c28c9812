/// Session registry: the process-wide owner of all learner states.
///
/// Each learner sits behind its own RwLock so status queries and exports
/// share access while a batch submission holds the write half. The registry
/// map itself is only locked long enough to resolve or mutate entries, never
/// across a learner computation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::errors::RecError;
use crate::learner::LearnerState;

pub type SharedLearner = Arc<RwLock<LearnerState>>;

#[derive(Default)]
pub struct SessionRegistry {
    learners: RwLock<HashMap<String, SharedLearner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            learners: RwLock::new(HashMap::new()),
        }
    }

    /// Register a fresh learner. Duplicate ids are rejected.
    pub async fn create(&self, state: LearnerState) -> Result<SharedLearner, RecError> {
        let mut map = self.learners.write().await;
        let id = state.learner_id().to_string();
        if map.contains_key(&id) {
            return Err(RecError::AlreadyExists(id));
        }
        let shared = Arc::new(RwLock::new(state));
        map.insert(id, shared.clone());
        Ok(shared)
    }

    /// Register or replace a learner, for snapshot imports.
    pub async fn insert(&self, state: LearnerState) -> SharedLearner {
        let id = state.learner_id().to_string();
        let shared = Arc::new(RwLock::new(state));
        self.learners.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, learner_id: &str) -> Result<SharedLearner, RecError> {
        let map = self.learners.read().await;
        map.get(learner_id)
            .cloned()
            .ok_or_else(|| RecError::UnknownLearner(learner_id.to_string()))
    }

    /// All registered learner ids, sorted.
    pub async fn list_ids(&self) -> Vec<String> {
        let map = self.learners.read().await;
        let mut ids: Vec<String> = map.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.learners.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.learners.read().await.is_empty()
    }

    /// Drop every learner. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let mut map = self.learners.write().await;
        let count = map.len();
        map.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use std::collections::{BTreeMap, HashMap};

    fn catalog() -> Catalog {
        Catalog::new(
            vec![("K1".to_string(), vec![1.0, 0.0])],
            HashMap::new(),
            vec![],
            vec![],
        )
        .unwrap()
    }

    fn learner(id: &str) -> LearnerState {
        LearnerState::new(id, BTreeMap::new(), &catalog(), 7919).unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let registry = SessionRegistry::new();
        registry.create(learner("s1")).await.unwrap();
        assert!(matches!(
            registry.create(learner("s1")).await,
            Err(RecError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_learner() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.get("nobody").await,
            Err(RecError::UnknownLearner(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let registry = SessionRegistry::new();
        registry.create(learner("b")).await.unwrap();
        registry.create(learner("a")).await.unwrap();
        assert_eq!(registry.list_ids().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_clear_all_counts() {
        let registry = SessionRegistry::new();
        registry.create(learner("a")).await.unwrap();
        registry.create(learner("b")).await.unwrap();
        assert_eq!(registry.clear_all().await, 2);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let registry = SessionRegistry::new();
        registry.create(learner("a")).await.unwrap();
        registry.insert(learner("a")).await;
        assert_eq!(registry.len().await, 1);
    }
}
