/// Simulation harness for exercising the engine end to end.
///
/// Drives synthetic learners with fixed answer-accuracy profiles through
/// recommend → answer → submit loops and aggregates mastery and strategy
/// metrics. Everything is seeded, so a run is reproducible bit for bit.

pub mod report;
pub mod runner;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shape of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub learners: usize,
    pub batches: usize,
    pub questions_per_batch: usize,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            learners: 4,
            batches: 6,
            questions_per_batch: 3,
            seed: 42,
        }
    }
}

/// A synthetic learner: answers correctly with the given probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub accuracy: f64,
}

/// Profiles cycling through strong, average, weak and struggling learners.
pub fn default_profiles(count: usize) -> Vec<LearnerProfile> {
    const ACCURACIES: [f64; 4] = [0.9, 0.7, 0.5, 0.3];
    (0..count)
        .map(|i| LearnerProfile {
            learner_id: format!("sim_{:03}", i + 1),
            accuracy: ACCURACIES[i % ACCURACIES.len()],
        })
        .collect()
}

/// Metrics for one submitted batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub batch: usize,
    pub recommended: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub average_mastery: f64,
}

/// Per-learner trajectory over the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerReport {
    pub learner_id: String,
    pub accuracy_profile: f64,
    pub batches: Vec<BatchMetrics>,
    pub final_average_mastery: f64,
    pub final_mastered_count: usize,
}

/// Full simulation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimReport {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub config: SimConfig,
    pub learners: Vec<LearnerReport>,
    /// Count of recommended questions per strategy source.
    pub strategy_distribution: BTreeMap<String, usize>,
    pub total_questions_answered: usize,
}
