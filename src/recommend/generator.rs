/// Candidate generation: per-strategy target-KP selection and the shared
/// question-pool scoring that feeds the ranker.

use std::collections::HashSet;

use super::{Candidate, Strategy};
use crate::catalog::{Catalog, Question};
use crate::config::EngineConfig;
use crate::learner::analyzer::{AbilityLevel, LearningState};
use crate::learner::LearnerState;
use crate::relations::{RelationKind, RelationVectors};
use crate::vecmath;

/// Questions kept per target KP before ranking.
const POOL_PER_KP: usize = 3;
/// Target KPs per single-strategy run.
const TARGET_LIMIT: usize = 3;

/// Borrowed inputs shared by every generator call.
pub struct GeneratorContext<'a> {
    pub catalog: &'a Catalog,
    pub relations: &'a RelationVectors,
    pub learner: &'a LearnerState,
    pub state: &'a LearningState,
    pub cfg: &'a EngineConfig,
}

/// Target KPs for one strategy, in preference order.
pub fn target_kps(ctx: &GeneratorContext<'_>, strategy: Strategy) -> Vec<String> {
    match strategy {
        Strategy::Consolidation => consolidation_targets(ctx),
        Strategy::GapFilling => gap_filling_targets(ctx),
        Strategy::Expansion => expansion_targets(ctx),
        Strategy::Balanced => balanced_targets(ctx),
    }
}

/// Up to 3 moderate KPs (lowest score first) plus up to 2 mastered KPs
/// (highest mastery first) for retention practice.
fn consolidation_targets(ctx: &GeneratorContext<'_>) -> Vec<String> {
    let mut targets: Vec<String> = ctx
        .state
        .moderate_points
        .iter()
        .take(3)
        .map(|(kp, _)| kp.clone())
        .collect();
    targets.extend(ctx.state.mastered_points.iter().take(2).cloned());
    targets
}

/// Weak KPs, preferring ones connected to mastered knowledge: up to 2 from
/// connected_weak (weakest first), padded to 3 from the remaining weak KPs
/// ordered ascending by mastery. With no mastered KPs the connectivity
/// preference is vacuous and selection falls through to the weakest KPs.
fn gap_filling_targets(ctx: &GeneratorContext<'_>) -> Vec<String> {
    let mut targets: Vec<String> = ctx
        .state
        .connectivity
        .connected_weak
        .iter()
        .take(2)
        .cloned()
        .collect();

    for (kp, _) in &ctx.state.weak_points {
        if targets.len() >= TARGET_LIMIT {
            break;
        }
        if !targets.contains(kp) {
            targets.push(kp.clone());
        }
    }
    targets
}

/// Expansion candidates from connectivity analysis, augmented by vector
/// arithmetic when fewer than 3 exist: probe embedding(kp_m) + relation(kind)
/// around the top mastered KPs and collect the best-matching unmastered KPs.
/// Without any mastered KP the strategy degrades to balanced selection.
fn expansion_targets(ctx: &GeneratorContext<'_>) -> Vec<String> {
    if ctx.state.mastered_points.is_empty() {
        return balanced_targets(ctx);
    }

    let mut targets: Vec<String> = ctx
        .state
        .connectivity
        .expansion_candidates
        .iter()
        .take(TARGET_LIMIT)
        .map(|(kp, _)| kp.clone())
        .collect();

    if targets.len() < TARGET_LIMIT {
        for kp in vector_probe_candidates(ctx, &targets) {
            if targets.len() >= TARGET_LIMIT {
                break;
            }
            targets.push(kp);
        }
    }
    targets
}

/// Score every unmastered KP against probes launched from the top-3 mastered
/// KPs through each relation kind; return unique KPs by best score.
fn vector_probe_candidates(ctx: &GeneratorContext<'_>, exclude: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = exclude.iter().map(|s| s.as_str()).collect();
    // Best probe score per KP id; BTreeMap keeps iteration deterministic.
    let mut best: std::collections::BTreeMap<&str, f64> = std::collections::BTreeMap::new();

    // mastered_points is sorted by mastery descending already.
    for mastered_kp in ctx.state.mastered_points.iter().take(3) {
        let mastered_emb = match ctx.catalog.embedding_opt(mastered_kp) {
            Some(e) => e,
            None => continue,
        };
        let mastery_weight = ctx.learner.mastery_of(mastered_kp);

        for kind in RelationKind::ALL {
            let relation = ctx.relations.get(kind);
            let probe: Vec<f64> = mastered_emb
                .iter()
                .zip(relation.iter())
                .map(|(e, r)| e + r)
                .collect();

            for kp_id in ctx.catalog.kp_ids() {
                if excluded.contains(kp_id.as_str()) {
                    continue;
                }
                if ctx.learner.mastery_of(kp_id) >= ctx.cfg.weak_threshold {
                    continue;
                }
                let embedding = match ctx.catalog.embedding_opt(kp_id) {
                    Some(e) => e,
                    None => continue,
                };
                let score = vecmath::cosine_similarity(&probe, embedding) * mastery_weight;
                let entry = best.entry(kp_id.as_str()).or_insert(f64::NEG_INFINITY);
                if score > *entry {
                    *entry = score;
                }
            }
        }
    }

    let mut ranked: Vec<(&str, f64)> = best.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.into_iter().map(|(kp, _)| kp.to_string()).collect()
}

/// One weakest KP, up to two lowest-moderate KPs, one highest-mastered KP,
/// capped at 3 targets total.
fn balanced_targets(ctx: &GeneratorContext<'_>) -> Vec<String> {
    let mut targets = Vec::new();
    if let Some((kp, _)) = ctx.state.weak_points.first() {
        targets.push(kp.clone());
    }
    for (kp, _) in ctx.state.moderate_points.iter().take(2) {
        if targets.len() >= TARGET_LIMIT {
            break;
        }
        targets.push(kp.clone());
    }
    if targets.len() < TARGET_LIMIT {
        if let Some(kp) = ctx.state.mastered_points.first() {
            targets.push(kp.clone());
        }
    }
    targets
}

/// Build the candidate pool for a strategy: for each target KP, the top 3
/// unattempted questions by (kp_weight, difficulty_match, mastered_overlap)
/// lexicographically descending.
pub fn candidates<'a>(ctx: &GeneratorContext<'a>, strategy: Strategy) -> Vec<Candidate<'a>> {
    let targets = target_kps(ctx, strategy);
    if targets.is_empty() {
        return Vec::new();
    }

    let attempted = ctx.learner.attempted_qids();
    // Overlap counts anything at or above the weak threshold as familiar
    // knowledge, a looser bar than the mastered partition.
    let familiar = ctx.learner.mastered(ctx.cfg.weak_threshold);

    let mut out = Vec::new();
    for target_kp in targets {
        let mut pool: Vec<Candidate<'a>> = ctx
            .catalog
            .questions_with(&target_kp)
            .filter(|q| !attempted.contains(q.qid.as_str()))
            .map(|q| {
                let coverage = q.knowledge_points.get(&target_kp).copied().unwrap_or(0.0);
                let relevance = mastered_overlap(q, &familiar);
                let difficulty = estimate_difficulty(q, ctx.learner);
                let adaptability =
                    difficulty_match(difficulty, ctx.state.ability_level, strategy);
                Candidate {
                    question: q,
                    target_kp: target_kp.clone(),
                    coverage,
                    relevance,
                    diversity: 0.1 * q.knowledge_points.len() as f64,
                    adaptability,
                }
            })
            .collect();

        pool.sort_by(|a, b| {
            b.coverage
                .partial_cmp(&a.coverage)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.adaptability
                        .partial_cmp(&a.adaptability)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| {
                    b.relevance
                        .partial_cmp(&a.relevance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.question.qid.cmp(&b.question.qid))
        });
        out.extend(pool.into_iter().take(POOL_PER_KP));
    }
    out
}

/// Mean of the question's weights over the learner's familiar KPs; 0 if the
/// learner has none.
fn mastered_overlap(question: &Question, familiar: &[String]) -> f64 {
    if familiar.is_empty() {
        return 0.0;
    }
    let sum: f64 = familiar
        .iter()
        .map(|kp| question.knowledge_points.get(kp).copied().unwrap_or(0.0))
        .sum();
    sum / familiar.len() as f64
}

/// Personal difficulty estimate: mastery-gap-weighted mean over the
/// question's KPs plus a small complexity bump for multi-KP questions.
pub fn estimate_difficulty(question: &Question, learner: &LearnerState) -> f64 {
    let mut total_difficulty = 0.0;
    let mut total_weight = 0.0;
    for (kp_id, weight) in &question.knowledge_points {
        total_difficulty += (1.0 - learner.mastery_of(kp_id)) * weight;
        total_weight += weight;
    }
    let base = if total_weight > 0.0 {
        total_difficulty / total_weight
    } else {
        0.5
    };
    let complexity = (question.knowledge_points.len() as f64 / 3.0).min(1.0);
    (base + complexity * 0.2).clamp(0.0, 1.0)
}

/// How well an estimated difficulty fits the learner's optimal band.
///
/// Inside the (strategy-shifted) band the match decays linearly from 1 at the
/// band center; outside it decays at 2x the distance to the band edge.
pub fn difficulty_match(difficulty: f64, ability: AbilityLevel, strategy: Strategy) -> f64 {
    let (mut lo, mut hi): (f64, f64) = match ability {
        AbilityLevel::Struggling => (0.2, 0.4),
        AbilityLevel::Beginner => (0.3, 0.5),
        AbilityLevel::Intermediate => (0.4, 0.7),
        AbilityLevel::Advanced => (0.6, 0.9),
    };
    let adjustment = match strategy {
        Strategy::GapFilling => -0.1,
        Strategy::Expansion => 0.1,
        Strategy::Consolidation | Strategy::Balanced => 0.0,
    };
    lo = (lo + adjustment).max(0.0);
    hi = (hi + adjustment).min(1.0);

    if difficulty >= lo && difficulty <= hi {
        let center = (lo + hi) / 2.0;
        let half_width = (hi - lo) / 2.0;
        if half_width > 0.0 {
            1.0 - (difficulty - center).abs() / half_width
        } else {
            1.0
        }
    } else {
        let distance = if difficulty < lo {
            lo - difficulty
        } else {
            difficulty - hi
        };
        (1.0 - 2.0 * distance).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn question(qid: &str, weights: &[(&str, f64)]) -> Question {
        Question {
            qid: qid.to_string(),
            content: "p".to_string(),
            options: ["x".into(), "y".into(), "z".into(), "w".into()],
            answer: "x".to_string(),
            knowledge_points: weights.iter().map(|(k, w)| (k.to_string(), *w)).collect(),
            difficulty: 0.5,
        }
    }

    #[test]
    fn test_difficulty_match_at_band_center_is_one() {
        // Intermediate band (0.4, 0.7), center 0.55
        let m = difficulty_match(0.55, AbilityLevel::Intermediate, Strategy::Balanced);
        assert!((m - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_difficulty_match_decays_outside_band() {
        let m = difficulty_match(0.9, AbilityLevel::Struggling, Strategy::Balanced);
        // Distance to band edge (0.4) is 0.5 -> 1 - 2*0.5 = 0
        assert_eq!(m, 0.0);
    }

    #[test]
    fn test_difficulty_match_strategy_offsets() {
        // Gap filling shifts the struggling band down to (0.1, 0.3)
        let inside = difficulty_match(0.2, AbilityLevel::Struggling, Strategy::GapFilling);
        assert!((inside - 1.0).abs() < 1e-12);
        // Expansion shifts the advanced band up to (0.7, 1.0)
        let inside_high = difficulty_match(0.85, AbilityLevel::Advanced, Strategy::Expansion);
        assert!((inside_high - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_difficulty_unmastered_single_kp() {
        use std::collections::BTreeMap;
        let mut e1 = vec![0.0; 4];
        e1[0] = 1.0;
        let catalog = crate::catalog::Catalog::new(
            vec![("K1".to_string(), e1)],
            HashMap::new(),
            vec![],
            vec![],
        )
        .unwrap();
        let learner =
            crate::learner::LearnerState::new("s", BTreeMap::new(), &catalog, 1).unwrap();
        let q = question("Q1", &[("K1", 1.0)]);
        // Mastery 0 -> base 1.0; one KP -> complexity 1/3 * 0.2; clamped to 1.0
        let d = estimate_difficulty(&q, &learner);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mastered_overlap_mean() {
        let q = question("Q1", &[("K1", 0.6), ("K2", 0.2)]);
        let familiar = vec!["K1".to_string(), "K3".to_string()];
        // (0.6 + 0.0) / 2
        assert!((mastered_overlap(&q, &familiar) - 0.3).abs() < 1e-12);
        assert_eq!(mastered_overlap(&q, &[]), 0.0);
    }
}
