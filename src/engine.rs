/// The embeddable operation surface of the recommender.
///
/// Owns the immutable catalog and relation vectors, plus the session
/// registry of learner states. Every mutation is all-or-nothing: inputs are
/// validated and graded before the per-learner write lock is taken, so a
/// failed call leaves the learner untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::errors::RecError;
use crate::grader::{self, AnswerSubmission, GradedAnswer};
use crate::learner::{LearnerState, ProgressSummary};
use crate::recommend::ranker;
use crate::recommend::RecommendedQuestion;
use crate::registry::SessionRegistry;
use crate::relations::RelationVectors;
use crate::snapshot::{self, LearnerSnapshot};

/// Acknowledgement returned by create_learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerCreated {
    pub learner_id: String,
    pub initial_mastery: BTreeMap<String, f64>,
}

/// Result of a batch submission: per-answer grading plus the post-update
/// mastery picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub learner_id: String,
    pub batch_completed: u64,
    pub answers: Vec<GradedAnswer>,
    pub correct_count: usize,
    pub mastery: BTreeMap<String, f64>,
    pub mastered: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerStatus {
    pub learner_id: String,
    pub batch_count: u64,
    pub total_answers: usize,
    pub mastery: BTreeMap<String, f64>,
    pub mastered: Vec<String>,
    pub vector_norm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakPoint {
    pub kp_id: String,
    pub name: String,
    pub score: f64,
}

/// Weak-point diagnostic: the scored list plus progress counters and
/// human-readable study advice built from the KP name table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakPointReport {
    pub learner_id: String,
    pub threshold: f64,
    pub weak_points: Vec<WeakPoint>,
    pub summary: ProgressSummary,
    pub advice: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub learner_id: String,
    pub batch_count: u64,
    pub total_answers: usize,
    pub mastered_count: usize,
    pub average_mastery: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFailure {
    pub learner_id: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

pub struct RecommendationEngine {
    catalog: Arc<Catalog>,
    relations: RelationVectors,
    registry: SessionRegistry,
    cfg: EngineConfig,
}

impl RecommendationEngine {
    /// Build an engine with simulated relation vectors (seeded from config).
    pub fn new(catalog: Arc<Catalog>, cfg: EngineConfig) -> Self {
        let relations = RelationVectors::simulated(catalog.dim(), cfg.relation_seed);
        Self::with_relation_vectors(catalog, cfg, relations)
    }

    /// Build an engine with externally supplied relation vectors.
    pub fn with_relation_vectors(
        catalog: Arc<Catalog>,
        cfg: EngineConfig,
        relations: RelationVectors,
    ) -> Self {
        RecommendationEngine {
            catalog,
            relations,
            registry: SessionRegistry::new(),
            cfg,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Register a new learner. Initial mastery KPs must exist in the catalog.
    pub async fn create_learner(
        &self,
        learner_id: &str,
        initial_mastery: Option<BTreeMap<String, f64>>,
    ) -> Result<LearnerCreated, RecError> {
        let state = LearnerState::new(
            learner_id,
            initial_mastery.unwrap_or_default(),
            &self.catalog,
            self.cfg.learner_seed,
        )?;
        let mastery = state.mastery().clone();
        self.registry.create(state).await?;

        tracing::info!(learner_id = %learner_id, kps = mastery.len(), "Learner created");
        Ok(LearnerCreated {
            learner_id: learner_id.to_string(),
            initial_mastery: mastery,
        })
    }

    /// Recommend up to `n` questions, drawing a fresh call nonce.
    pub async fn get_recommendations(
        &self,
        learner_id: &str,
        n: usize,
    ) -> Result<Vec<RecommendedQuestion>, RecError> {
        let nonce = uuid::Uuid::new_v4().as_u128() as u64;
        self.get_recommendations_seeded(learner_id, n, nonce).await
    }

    /// Recommend with an explicit call nonce. The same (learner, batch,
    /// nonce) triple always reproduces the same ranking.
    pub async fn get_recommendations_seeded(
        &self,
        learner_id: &str,
        n: usize,
        call_nonce: u64,
    ) -> Result<Vec<RecommendedQuestion>, RecError> {
        let shared = self.registry.get(learner_id).await?;
        let learner = shared.read().await;

        let recommendations = ranker::recommend_for_learner(
            &self.catalog,
            &self.relations,
            &learner,
            &self.cfg,
            n,
            call_nonce,
        );

        tracing::info!(
            learner_id = %learner_id,
            requested = n,
            returned = recommendations.len(),
            "Recommendations generated"
        );
        Ok(recommendations)
    }

    /// Grade and commit one answer batch. Grading happens before the write
    /// lock is taken; any error leaves the learner unchanged.
    pub async fn submit_answers(
        &self,
        learner_id: &str,
        submissions: &[AnswerSubmission],
    ) -> Result<BatchSummary, RecError> {
        if submissions.is_empty() {
            return Err(RecError::EmptyBatch);
        }
        let shared = self.registry.get(learner_id).await?;
        let graded = grader::grade_batch(&self.catalog, submissions)?;

        let mut learner = shared.write().await;
        learner.update_from_answers(&graded, &self.catalog, &self.cfg)?;

        let correct_count = graded.iter().filter(|a| a.is_correct).count();
        let summary = BatchSummary {
            learner_id: learner_id.to_string(),
            batch_completed: learner.batch_count(),
            correct_count,
            mastery: learner.mastery().clone(),
            mastered: learner.mastered(self.cfg.mastered_threshold),
            answers: graded,
        };

        tracing::info!(
            learner_id = %learner_id,
            batch = summary.batch_completed,
            correct = summary.correct_count,
            total = summary.answers.len(),
            "Batch submitted"
        );
        Ok(summary)
    }

    /// Grade a submission list without touching any learner state.
    pub fn check_answers(
        &self,
        submissions: &[AnswerSubmission],
    ) -> Result<Vec<GradedAnswer>, RecError> {
        grader::grade_batch(&self.catalog, submissions)
    }

    /// Weak-point diagnostic with study advice.
    pub async fn get_weak_points(
        &self,
        learner_id: &str,
        threshold: Option<f64>,
    ) -> Result<WeakPointReport, RecError> {
        let threshold = threshold.unwrap_or(self.cfg.weak_threshold);
        let shared = self.registry.get(learner_id).await?;
        let learner = shared.read().await;

        let weak = learner.weak(threshold);
        let weak_points: Vec<WeakPoint> = weak
            .iter()
            .map(|(kp_id, score)| WeakPoint {
                kp_id: kp_id.clone(),
                name: self.catalog.name(kp_id).to_string(),
                score: *score,
            })
            .collect();

        Ok(WeakPointReport {
            learner_id: learner_id.to_string(),
            threshold,
            advice: weak_point_advice(&weak_points),
            summary: learner.progress_summary(&self.cfg),
            weak_points,
        })
    }

    pub async fn get_status(&self, learner_id: &str) -> Result<LearnerStatus, RecError> {
        let shared = self.registry.get(learner_id).await?;
        let learner = shared.read().await;
        Ok(LearnerStatus {
            learner_id: learner_id.to_string(),
            batch_count: learner.batch_count(),
            total_answers: learner.answer_history().len(),
            mastery: learner.mastery().clone(),
            mastered: learner.mastered(self.cfg.mastered_threshold),
            vector_norm: crate::vecmath::l2_norm(learner.vector()),
        })
    }

    pub async fn export(&self, learner_id: &str) -> Result<LearnerSnapshot, RecError> {
        let shared = self.registry.get(learner_id).await?;
        let learner = shared.read().await;
        Ok(snapshot::export(&learner, self.catalog.dim()))
    }

    /// Import one snapshot, registering (or replacing) the learner.
    pub async fn import(&self, value: serde_json::Value) -> Result<String, RecError> {
        let state = snapshot::import(value, &self.catalog, &self.cfg)?;
        let learner_id = state.learner_id().to_string();
        self.registry.insert(state).await;
        tracing::info!(learner_id = %learner_id, "Learner imported");
        Ok(learner_id)
    }

    pub async fn export_all(&self) -> Vec<LearnerSnapshot> {
        let mut snapshots = Vec::new();
        for id in self.registry.list_ids().await {
            if let Ok(shared) = self.registry.get(&id).await {
                let learner = shared.read().await;
                snapshots.push(snapshot::export(&learner, self.catalog.dim()));
            }
        }
        snapshots
    }

    /// Replace the whole registry with the given snapshots. Individual
    /// failures are collected, not fatal.
    pub async fn import_all(&self, values: Vec<serde_json::Value>) -> ImportReport {
        self.registry.clear_all().await;

        let mut report = ImportReport {
            imported: Vec::new(),
            failed: Vec::new(),
        };
        for value in values {
            let hinted_id = value
                .get("learner_id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            match snapshot::import(value, &self.catalog, &self.cfg) {
                Ok(state) => {
                    report.imported.push(state.learner_id().to_string());
                    self.registry.insert(state).await;
                }
                Err(e) => {
                    tracing::warn!(
                        learner_id = ?hinted_id,
                        error = %e,
                        "Snapshot import failed"
                    );
                    report.failed.push(ImportFailure {
                        learner_id: hinted_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            imported = report.imported.len(),
            failed = report.failed.len(),
            "Bulk import finished"
        );
        report
    }

    pub async fn clear_all(&self) -> usize {
        let count = self.registry.clear_all().await;
        tracing::info!(cleared = count, "Registry cleared");
        count
    }

    pub async fn list(&self) -> Vec<LearnerSummary> {
        let mut out = Vec::new();
        for id in self.registry.list_ids().await {
            if let Ok(shared) = self.registry.get(&id).await {
                let learner = shared.read().await;
                out.push(LearnerSummary {
                    learner_id: id,
                    batch_count: learner.batch_count(),
                    total_answers: learner.answer_history().len(),
                    mastered_count: learner.mastered(self.cfg.mastered_threshold).len(),
                    average_mastery: learner.average_mastery(),
                });
            }
        }
        out
    }
}

/// Study advice for the weakest points, bucketed by severity.
fn weak_point_advice(weak_points: &[WeakPoint]) -> Vec<String> {
    if weak_points.is_empty() {
        return vec!["No weak knowledge points at the current threshold.".to_string()];
    }

    let mut advice: Vec<String> = weak_points
        .iter()
        .take(3)
        .map(|wp| {
            if wp.score < 0.1 {
                format!(
                    "{}: mastery {:.2} is very low, revisit the basic concepts first",
                    wp.name, wp.score
                )
            } else if wp.score < 0.2 {
                format!(
                    "{}: mastery {:.2} needs focused practice",
                    wp.name, wp.score
                )
            } else {
                format!(
                    "{}: mastery {:.2} is close, a round of consolidation exercises should lift it",
                    wp.name, wp.score
                )
            }
        })
        .collect();

    if weak_points.len() > 5 {
        advice.push(
            "Many weak points: work through the two or three weakest before spreading out."
                .to_string(),
        );
    } else if weak_points.len() > 2 {
        advice.push("Rotate between the weak points rather than cramming a single one.".to_string());
    } else {
        advice.push("Concentrate on the remaining weak points to clear them quickly.".to_string());
    }
    advice
}
