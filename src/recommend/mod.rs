/// Shared recommendation types.
///
/// The four strategies form a closed enum; every strategy produces a target
/// KP list and feeds the same candidate-scoring machinery (no inheritance,
/// no dynamic dispatch).

pub mod generator;
pub mod ranker;
pub mod strategy;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    GapFilling,
    Consolidation,
    Expansion,
    Balanced,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::GapFilling => "gap_filling",
            Strategy::Consolidation => "consolidation",
            Strategy::Expansion => "expansion",
            Strategy::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a recommended question came from: a strategy run, or the
/// cold-start path that bypasses strategy selection entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySource {
    ColdStart,
    GapFilling,
    Consolidation,
    Expansion,
    Balanced,
}

impl StrategySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategySource::ColdStart => "cold_start",
            StrategySource::GapFilling => "gap_filling",
            StrategySource::Consolidation => "consolidation",
            StrategySource::Expansion => "expansion",
            StrategySource::Balanced => "balanced",
        }
    }
}

impl From<Strategy> for StrategySource {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::GapFilling => StrategySource::GapFilling,
            Strategy::Consolidation => StrategySource::Consolidation,
            Strategy::Expansion => StrategySource::Expansion,
            Strategy::Balanced => StrategySource::Balanced,
        }
    }
}

/// Outcome of strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub primary: Strategy,
    /// True once the learner has enough history for mixed-mode blending.
    pub mixed: bool,
    /// Final additive scores, for diagnostics.
    pub scores: Vec<(Strategy, f64)>,
}

/// A scored candidate: one question considered for one target KP.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub question: &'a Question,
    pub target_kp: String,
    /// Weight of the target KP in the question's weight map.
    pub coverage: f64,
    /// Mean weight over the learner's mastered KPs.
    pub relevance: f64,
    /// 0.1 per KP the question touches.
    pub diversity: f64,
    /// Difficulty match against the learner's ability band.
    pub adaptability: f64,
}

/// A question as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedQuestion {
    pub qid: String,
    pub content: String,
    pub options: [String; 4],
    pub knowledge_points: HashMap<String, f64>,
    pub difficulty: f64,
    pub strategy_source: StrategySource,
    pub is_mixed_strategy: bool,
    pub score: f64,
}
