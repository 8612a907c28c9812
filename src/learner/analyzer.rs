/// Learning-state analysis: derives the signals the strategy selector and
/// candidate generator consume from a learner's raw state.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::learner::LearnerState;
use crate::vecmath;

/// Weak KPs need a mastered neighbor this similar to count as connected.
const CONNECTED_SIMILARITY: f64 = 0.3;
/// Expansion candidates need at least this similarity to a mastered KP.
const EXPANSION_SIMILARITY: f64 = 0.4;
/// How many expansion candidates to keep.
const EXPANSION_LIMIT: usize = 5;
/// Minimum answers before a trend can be read.
const TREND_MIN_ANSWERS: usize = 6;
/// Accuracy delta between history halves that counts as a real change.
const TREND_EPSILON: f64 = 0.1;
/// Vector snapshots considered for momentum.
const MOMENTUM_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    InsufficientData,
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityLevel {
    Struggling,
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningTrend {
    pub trend: Trend,
    /// Mean L2 distance between consecutive recent vector snapshots.
    pub momentum: f64,
}

/// Embedding-space neighborhood structure of the learner's knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConnectivity {
    /// Weak KPs with at least one sufficiently similar mastered KP.
    pub connected_weak: Vec<String>,
    /// Weak KPs with no mastered neighbor.
    pub isolated_weak: Vec<String>,
    /// Unmastered, non-weak KPs nearest to the mastered set, best first.
    pub expansion_candidates: Vec<(String, f64)>,
}

/// Everything the strategy selector needs, derived in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningState {
    pub weak_points: Vec<(String, f64)>,
    pub moderate_points: Vec<(String, f64)>,
    pub mastered_points: Vec<String>,
    pub avg_mastery: f64,
    pub mastery_variance: f64,
    pub recent_accuracy: f64,
    pub total_answers: usize,
    pub batch_count: u64,
    pub learning_trend: LearningTrend,
    pub ability_level: AbilityLevel,
    pub connectivity: KnowledgeConnectivity,
}

/// Analyze a learner against the catalog.
pub fn analyze(learner: &LearnerState, catalog: &Catalog, cfg: &EngineConfig) -> LearningState {
    let weak_points = learner.weak(cfg.weak_threshold);
    let moderate_points = learner.moderate(cfg.weak_threshold, cfg.mastered_threshold);
    let mastered_points = learner.mastered(cfg.mastered_threshold);

    let recent_accuracy = recent_accuracy(learner, cfg.recent_window);
    let learning_trend = learning_trend(learner);
    let ability_level = ability_level(learner.average_mastery(), recent_accuracy);
    let connectivity = connectivity(catalog, &mastered_points, &weak_points);

    LearningState {
        avg_mastery: learner.average_mastery(),
        mastery_variance: learner.mastery_variance(),
        recent_accuracy,
        total_answers: learner.answer_history().len(),
        batch_count: learner.batch_count(),
        weak_points,
        moderate_points,
        mastered_points,
        learning_trend,
        ability_level,
        connectivity,
    }
}

/// Fraction correct over the trailing window (fewer if history is shorter;
/// 0 with no history).
pub fn recent_accuracy(learner: &LearnerState, window: usize) -> f64 {
    let history = learner.answer_history();
    if history.is_empty() || window == 0 {
        return 0.0;
    }
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];
    let correct = recent.iter().filter(|a| a.is_correct).count();
    correct as f64 / recent.len() as f64
}

/// Accuracy trend across history halves, plus vector momentum.
pub fn learning_trend(learner: &LearnerState) -> LearningTrend {
    let history = learner.answer_history();

    let trend = if history.len() >= TREND_MIN_ANSWERS {
        let mid = history.len() / 2;
        let accuracy = |slice: &[crate::grader::GradedAnswer]| {
            slice.iter().filter(|a| a.is_correct).count() as f64 / slice.len() as f64
        };
        let first = accuracy(&history[..mid]);
        let second = accuracy(&history[mid..]);
        if second > first + TREND_EPSILON {
            Trend::Improving
        } else if second < first - TREND_EPSILON {
            Trend::Declining
        } else {
            Trend::Stable
        }
    } else {
        Trend::InsufficientData
    };

    let snapshots = learner.vector_history();
    let start = snapshots.len().saturating_sub(MOMENTUM_WINDOW);
    let recent = &snapshots[start..];
    let momentum = if recent.len() >= 2 {
        let total: f64 = recent
            .windows(2)
            .map(|pair| vecmath::euclidean_distance(&pair[0], &pair[1]))
            .sum();
        total / (recent.len() - 1) as f64
    } else {
        0.0
    };

    LearningTrend { trend, momentum }
}

/// Combined mastery/accuracy score mapped to the four ability bands.
pub fn ability_level(avg_mastery: f64, recent_accuracy: f64) -> AbilityLevel {
    let combined = (avg_mastery + recent_accuracy) / 2.0;
    if combined >= 0.8 {
        AbilityLevel::Advanced
    } else if combined >= 0.6 {
        AbilityLevel::Intermediate
    } else if combined >= 0.4 {
        AbilityLevel::Beginner
    } else {
        AbilityLevel::Struggling
    }
}

fn connectivity(
    catalog: &Catalog,
    mastered: &[String],
    weak: &[(String, f64)],
) -> KnowledgeConnectivity {
    let mut connected_weak = Vec::new();
    let mut isolated_weak = Vec::new();

    for (weak_kp, _) in weak {
        let weak_emb = match catalog.embedding_opt(weak_kp) {
            Some(e) => e,
            None => {
                isolated_weak.push(weak_kp.clone());
                continue;
            }
        };
        let connected = mastered.iter().any(|mastered_kp| {
            catalog
                .embedding_opt(mastered_kp)
                .map(|m| vecmath::cosine_similarity(weak_emb, m) > CONNECTED_SIMILARITY)
                .unwrap_or(false)
        });
        if connected {
            connected_weak.push(weak_kp.clone());
        } else {
            isolated_weak.push(weak_kp.clone());
        }
    }

    // Expansion candidates: catalog KPs that are neither mastered nor weak,
    // scored by their best similarity to any mastered KP.
    let mastered_set: std::collections::HashSet<&str> =
        mastered.iter().map(|s| s.as_str()).collect();
    let weak_set: std::collections::HashSet<&str> =
        weak.iter().map(|(kp, _)| kp.as_str()).collect();

    let mut expansion_candidates: Vec<(String, f64)> = Vec::new();
    for kp_id in catalog.kp_ids() {
        if mastered_set.contains(kp_id.as_str()) || weak_set.contains(kp_id.as_str()) {
            continue;
        }
        let embedding = match catalog.embedding_opt(kp_id) {
            Some(e) => e,
            None => continue,
        };
        let best = mastered
            .iter()
            .filter_map(|m| catalog.embedding_opt(m))
            .map(|m| vecmath::cosine_similarity(embedding, m))
            .fold(f64::NEG_INFINITY, f64::max);
        if best > EXPANSION_SIMILARITY {
            expansion_candidates.push((kp_id.clone(), best));
        }
    }
    expansion_candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    expansion_candidates.truncate(EXPANSION_LIMIT);

    KnowledgeConnectivity {
        connected_weak,
        isolated_weak,
        expansion_candidates,
    }
}
