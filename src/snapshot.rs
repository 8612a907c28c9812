/// Versioned export/import of learner state.
///
/// The snapshot is a plain JSON object; vectors are stored as float arrays.
/// Import validates the required fields, checks vector dimensions against
/// the live catalog, and re-derives the vector from mastery when the
/// snapshot carries none. Unknown KPs or qids inside a snapshot are
/// preserved verbatim; operations that later need them error as usual.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::errors::RecError;
use crate::grader::GradedAnswer;
use crate::learner::LearnerState;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1.1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub version: String,
    pub learner_id: String,
    pub embedding_dim: usize,
    pub mastery: BTreeMap<String, f64>,
    pub answer_history: Vec<GradedAnswer>,
    pub batch_count: u64,
    pub vector: Option<Vec<f64>>,
    pub vector_history: Vec<Vec<f64>>,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot a learner. Pure read; safe under a shared lock.
pub fn export(learner: &LearnerState, dim: usize) -> LearnerSnapshot {
    LearnerSnapshot {
        version: SNAPSHOT_VERSION.to_string(),
        learner_id: learner.learner_id().to_string(),
        embedding_dim: dim,
        mastery: learner.mastery().clone(),
        answer_history: learner.answer_history().to_vec(),
        batch_count: learner.batch_count(),
        vector: Some(learner.vector().to_vec()),
        vector_history: learner.vector_history().to_vec(),
        timestamp: Utc::now(),
    }
}

/// Reconstruct a learner from a raw snapshot value.
///
/// `learner_id`, `mastery` and `answer_history` are required; anything else
/// falls back to a derivable default. A version mismatch is a warning, not
/// an error.
pub fn import(
    value: serde_json::Value,
    catalog: &Catalog,
    cfg: &EngineConfig,
) -> Result<LearnerState, RecError> {
    let object = value
        .as_object()
        .ok_or_else(|| RecError::InvalidSnapshot("snapshot is not a JSON object".to_string()))?;

    for field in ["learner_id", "mastery", "answer_history"] {
        if !object.contains_key(field) {
            return Err(RecError::InvalidSnapshot(format!(
                "missing required field '{}'",
                field
            )));
        }
    }

    let raw: RawSnapshot = serde_json::from_value(value)
        .map_err(|e| RecError::InvalidSnapshot(e.to_string()))?;

    if raw.version != SNAPSHOT_VERSION {
        tracing::warn!(
            learner_id = %raw.learner_id,
            found = %raw.version,
            expected = SNAPSHOT_VERSION,
            "Snapshot version mismatch, importing anyway"
        );
    }

    if let Some(vector) = &raw.vector {
        check_dim(vector, catalog)?;
    }
    for snapshot in &raw.vector_history {
        check_dim(snapshot, catalog)?;
    }

    let mastery: BTreeMap<String, f64> = raw
        .mastery
        .into_iter()
        .map(|(kp, score)| (kp, score.clamp(0.0, 1.0)))
        .collect();

    match raw.vector {
        Some(vector) => {
            let vector_history = if raw.vector_history.is_empty() {
                vec![vector.clone()]
            } else {
                raw.vector_history
            };
            Ok(LearnerState::from_parts(
                raw.learner_id,
                mastery,
                vector,
                raw.answer_history,
                raw.batch_count,
                vector_history,
            ))
        }
        None => {
            // No vector stored: re-derive from mastery against the current
            // catalog, as for a fresh learner.
            let mut learner = LearnerState::from_parts(
                raw.learner_id,
                mastery,
                vec![0.0; catalog.dim()],
                raw.answer_history,
                raw.batch_count,
                Vec::new(),
            );
            learner.initialize_vector_from_mastery(catalog, cfg.learner_seed);
            Ok(learner)
        }
    }
}

fn check_dim(vector: &[f64], catalog: &Catalog) -> Result<(), RecError> {
    if vector.len() != catalog.dim() {
        return Err(RecError::DimensionMismatch {
            expected: catalog.dim(),
            found: vector.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default = "unknown_version")]
    version: String,
    learner_id: String,
    mastery: BTreeMap<String, f64>,
    answer_history: Vec<GradedAnswer>,
    #[serde(default)]
    batch_count: u64,
    #[serde(default)]
    vector: Option<Vec<f64>>,
    #[serde(default)]
    vector_history: Vec<Vec<f64>>,
}

fn unknown_version() -> String {
    "unversioned".to_string()
}
