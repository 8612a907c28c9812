/// Learner state: per-learner mastery map, position vector in the shared
/// embedding space, answer history, and vector history.
///
/// Mutated only by `update_from_answers`; between mutations the state is a
/// plain value that can be cloned freely. Invariants kept here:
/// - every mastery score stays in [0, 1]
/// - the vector is zero or unit norm after every mutation
/// - vector_history has exactly batch_count + 1 entries
/// - histories are append-only

pub mod analyzer;

use std::collections::{BTreeMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::errors::RecError;
use crate::grader::GradedAnswer;
use crate::seed;
use crate::vecmath;

#[derive(Debug, Clone)]
pub struct LearnerState {
    learner_id: String,
    /// KP id -> mastery in [0, 1]. Absent key means 0. BTreeMap keeps every
    /// derived iteration deterministic.
    mastery: BTreeMap<String, f64>,
    vector: Vec<f64>,
    answer_history: Vec<GradedAnswer>,
    batch_count: u64,
    vector_history: Vec<Vec<f64>>,
}

/// Aggregate progress counters for reports and listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_knowledge_points: usize,
    pub mastered: usize,
    pub moderate: usize,
    pub weak: usize,
    pub mastered_list: Vec<String>,
    pub weak_list: Vec<String>,
    pub average_mastery: f64,
}

impl LearnerState {
    /// Create a fresh learner. Initial mastery KPs must exist in the catalog;
    /// scores are clamped into [0, 1]. The initial vector is derived from
    /// mastery (or a seeded random fallback when mastery is empty).
    pub fn new(
        learner_id: impl Into<String>,
        initial_mastery: BTreeMap<String, f64>,
        catalog: &Catalog,
        system_seed: u64,
    ) -> Result<Self, RecError> {
        let learner_id = learner_id.into();
        for kp_id in initial_mastery.keys() {
            if !catalog.contains_kp(kp_id) {
                return Err(RecError::UnknownKp(kp_id.clone()));
            }
        }
        let mastery: BTreeMap<String, f64> = initial_mastery
            .into_iter()
            .map(|(kp, score)| (kp, score.clamp(0.0, 1.0)))
            .collect();

        let mut state = LearnerState {
            learner_id,
            mastery,
            vector: vec![0.0; catalog.dim()],
            answer_history: Vec::new(),
            batch_count: 0,
            vector_history: Vec::new(),
        };
        state.initialize_vector_from_mastery(catalog, system_seed);
        Ok(state)
    }

    /// Reconstruct a learner from snapshot parts. Skips the unknown-KP check
    /// so snapshots written against an older catalog import verbatim.
    pub(crate) fn from_parts(
        learner_id: String,
        mastery: BTreeMap<String, f64>,
        vector: Vec<f64>,
        answer_history: Vec<GradedAnswer>,
        batch_count: u64,
        vector_history: Vec<Vec<f64>>,
    ) -> Self {
        LearnerState {
            learner_id,
            mastery,
            vector,
            answer_history,
            batch_count,
            vector_history,
        }
    }

    /// Derive the vector as the mastery-weighted average of KP embeddings,
    /// normalized; or a small seeded random vector when mastery carries no
    /// usable weight. Resets vector_history to the single initial snapshot.
    pub fn initialize_vector_from_mastery(&mut self, catalog: &Catalog, system_seed: u64) {
        let dim = catalog.dim();
        let mut weighted = vec![0.0; dim];
        let mut total = 0.0;

        for (kp_id, &score) in &self.mastery {
            if score <= 0.0 {
                continue;
            }
            if let Some(embedding) = catalog.embedding_opt(kp_id) {
                vecmath::add_scaled(&mut weighted, embedding, score);
                total += score;
            }
        }

        if total > 0.0 {
            for x in weighted.iter_mut() {
                *x /= total;
            }
        } else {
            let seed = seed::learner_vector_seed(system_seed, &self.learner_id);
            let mut rng = StdRng::seed_from_u64(seed);
            let normal = Normal::new(0.0, 0.1).expect("std deviation is positive");
            for x in weighted.iter_mut() {
                *x = rng.sample(normal);
            }
        }

        vecmath::normalize(&mut weighted);
        self.vector = weighted;
        self.vector_history = vec![self.vector.clone()];
    }

    /// Apply one graded batch: blend the batch vector into the learner
    /// vector, bump mastery, and append to the histories.
    ///
    /// The batch vector is computed before any field is touched, so an error
    /// leaves the state unchanged.
    pub fn update_from_answers(
        &mut self,
        batch: &[GradedAnswer],
        catalog: &Catalog,
        cfg: &EngineConfig,
    ) -> Result<(), RecError> {
        if batch.is_empty() {
            return Err(RecError::EmptyBatch);
        }

        let batch_vector = self.compute_batch_vector(batch, catalog, cfg);

        if self.batch_count == 0 {
            self.vector = batch_vector;
        } else {
            let alpha = cfg.blend_alpha;
            for (v, b) in self.vector.iter_mut().zip(batch_vector.iter()) {
                *v = alpha * *v + (1.0 - alpha) * b;
            }
        }
        vecmath::normalize(&mut self.vector);

        for answer in batch {
            let delta = if answer.is_correct {
                cfg.correct_delta
            } else {
                cfg.wrong_delta
            };
            for (kp_id, weight) in &answer.kp_weights {
                let entry = self.mastery.entry(kp_id.clone()).or_insert(0.0);
                *entry = (*entry + delta * weight).min(1.0);
            }
        }

        self.answer_history.extend(batch.iter().cloned());
        self.vector_history.push(self.vector.clone());
        self.batch_count += 1;
        Ok(())
    }

    /// Per-answer contribution: strength * weight * embedding(kp), where
    /// strength is 1.0 for a correct answer and cfg.wrong_strength otherwise.
    /// Averaged over the batch size.
    fn compute_batch_vector(
        &self,
        batch: &[GradedAnswer],
        catalog: &Catalog,
        cfg: &EngineConfig,
    ) -> Vec<f64> {
        let mut acc = vec![0.0; catalog.dim()];
        for answer in batch {
            let strength = if answer.is_correct {
                1.0
            } else {
                cfg.wrong_strength
            };
            for (kp_id, weight) in &answer.kp_weights {
                // Unknown KPs can only come from imported foreign history;
                // they contribute nothing.
                if let Some(embedding) = catalog.embedding_opt(kp_id) {
                    vecmath::add_scaled(&mut acc, embedding, strength * weight);
                }
            }
        }
        let n = batch.len() as f64;
        for x in acc.iter_mut() {
            *x /= n;
        }
        acc
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn mastery(&self) -> &BTreeMap<String, f64> {
        &self.mastery
    }

    /// Mastery for one KP; absent means 0.
    pub fn mastery_of(&self, kp_id: &str) -> f64 {
        self.mastery.get(kp_id).copied().unwrap_or(0.0)
    }

    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    pub fn answer_history(&self) -> &[GradedAnswer] {
        &self.answer_history
    }

    pub fn batch_count(&self) -> u64 {
        self.batch_count
    }

    pub fn vector_history(&self) -> &[Vec<f64>] {
        &self.vector_history
    }

    pub fn attempted_qids(&self) -> HashSet<&str> {
        self.answer_history.iter().map(|a| a.qid.as_str()).collect()
    }

    /// KPs with mastery >= threshold, highest first (ties by id).
    pub fn mastered(&self, threshold: f64) -> Vec<String> {
        let mut out: Vec<(&String, f64)> = self
            .mastery
            .iter()
            .filter(|(_, &score)| score >= threshold)
            .map(|(kp, &score)| (kp, score))
            .collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        out.into_iter().map(|(kp, _)| kp.clone()).collect()
    }

    /// KPs with mastery < threshold, weakest first (ties by id).
    pub fn weak(&self, threshold: f64) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .mastery
            .iter()
            .filter(|(_, &score)| score < threshold)
            .map(|(kp, &score)| (kp.clone(), score))
            .collect();
        out.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    /// KPs with mastery in [weak_threshold, mastered_threshold), lowest first.
    pub fn moderate(&self, weak_threshold: f64, mastered_threshold: f64) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .mastery
            .iter()
            .filter(|(_, &score)| score >= weak_threshold && score < mastered_threshold)
            .map(|(kp, &score)| (kp.clone(), score))
            .collect();
        out.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    pub fn average_mastery(&self) -> f64 {
        if self.mastery.is_empty() {
            return 0.0;
        }
        self.mastery.values().sum::<f64>() / self.mastery.len() as f64
    }

    /// Population variance of the mastery scores.
    pub fn mastery_variance(&self) -> f64 {
        if self.mastery.is_empty() {
            return 0.0;
        }
        let mean = self.average_mastery();
        self.mastery
            .values()
            .map(|&s| (s - mean) * (s - mean))
            .sum::<f64>()
            / self.mastery.len() as f64
    }

    pub fn progress_summary(&self, cfg: &EngineConfig) -> ProgressSummary {
        let mastered = self.mastered(cfg.mastered_threshold);
        let weak = self.weak(cfg.weak_threshold);
        let moderate = self.moderate(cfg.weak_threshold, cfg.mastered_threshold);
        ProgressSummary {
            total_knowledge_points: self.mastery.len(),
            mastered: mastered.len(),
            moderate: moderate.len(),
            weak: weak.len(),
            mastered_list: mastered,
            weak_list: weak.into_iter().map(|(kp, _)| kp).collect(),
            average_mastery: self.average_mastery(),
        }
    }
}
