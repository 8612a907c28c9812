/// Strategy selector: scores the four strategies from the learning state and
/// picks the primary by argmax with a fixed tie-break priority.

use super::{Strategy, StrategyDecision};
use crate::learner::analyzer::{AbilityLevel, LearningState, Trend};

/// Batches after which mixed-mode blending kicks in.
const MIXED_MODE_MIN_BATCHES: u64 = 3;

/// Tie-break priority, strongest first.
const PRIORITY: [Strategy; 4] = [
    Strategy::GapFilling,
    Strategy::Expansion,
    Strategy::Consolidation,
    Strategy::Balanced,
];

/// Score the strategies and pick the primary.
///
/// With no scored KPs at all the selector degrades to balanced, single mode.
pub fn select(state: &LearningState) -> StrategyDecision {
    let weak = state.weak_points.len();
    let mastered = state.mastered_points.len();
    let moderate = state.moderate_points.len();
    let total = weak + mastered + moderate;

    if total == 0 {
        return StrategyDecision {
            primary: Strategy::Balanced,
            mixed: false,
            scores: PRIORITY.iter().map(|&s| (s, 0.0)).collect(),
        };
    }

    let w = weak as f64 / total as f64;
    let m = mastered as f64 / total as f64;
    let o = moderate as f64 / total as f64;

    let mut gap_filling = 0.0;
    let mut consolidation = 0.0;
    let mut expansion = 0.0;
    let balanced = 0.2;

    if w > 0.4 {
        gap_filling += 0.4;
    } else if w > 0.2 {
        gap_filling += 0.2;
    }

    if m > 0.6 {
        expansion += 0.4;
    } else if m > 0.4 {
        expansion += 0.2;
    }

    if o > 0.4 {
        consolidation += 0.4;
    } else if o > 0.2 {
        consolidation += 0.2;
    }

    if state.recent_accuracy < 0.4 {
        gap_filling += 0.3;
    } else if state.recent_accuracy > 0.8 {
        expansion += 0.3;
    } else {
        consolidation += 0.2;
    }

    match state.learning_trend.trend {
        Trend::Declining => {
            gap_filling += 0.2;
            consolidation += 0.1;
        }
        Trend::Improving => {
            expansion += 0.2;
            consolidation += 0.1;
        }
        Trend::Stable | Trend::InsufficientData => {}
    }

    match state.ability_level {
        AbilityLevel::Struggling => gap_filling += 0.3,
        AbilityLevel::Advanced => expansion += 0.3,
        AbilityLevel::Beginner | AbilityLevel::Intermediate => consolidation += 0.2,
    }

    if state.connectivity.isolated_weak.len() > 2 {
        gap_filling += 0.2;
    }
    if state.connectivity.expansion_candidates.len() > 3 {
        expansion += 0.2;
    }
    if state.connectivity.connected_weak.len() > 1 {
        consolidation += 0.1;
    }

    let score_of = |s: Strategy| match s {
        Strategy::GapFilling => gap_filling,
        Strategy::Consolidation => consolidation,
        Strategy::Expansion => expansion,
        Strategy::Balanced => balanced,
    };

    // Argmax over the priority order: a later strategy must strictly beat
    // the current best to win.
    let mut primary = PRIORITY[0];
    let mut best = score_of(primary);
    for &candidate in &PRIORITY[1..] {
        let score = score_of(candidate);
        if score > best {
            primary = candidate;
            best = score;
        }
    }

    StrategyDecision {
        primary,
        mixed: state.batch_count > MIXED_MODE_MIN_BATCHES,
        scores: PRIORITY.iter().map(|&s| (s, score_of(s))).collect(),
    }
}
