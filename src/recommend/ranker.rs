/// Ranking: weighted multi-criterion scoring of candidates, seeded jitter,
/// qid de-duplication, mixed-strategy allocation and merging, and the
/// cold-start path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::generator::{self, GeneratorContext};
use super::strategy;
use super::{Candidate, RecommendedQuestion, Strategy, StrategySource};
use crate::catalog::Question;
use crate::learner::analyzer;
use crate::seed;

/// Per-strategy weights for (coverage, relevance, diversity, adaptability).
pub fn strategy_weights(strategy: Strategy) -> [f64; 4] {
    match strategy {
        Strategy::GapFilling => [0.5, 0.2, 0.1, 0.2],
        Strategy::Expansion => [0.3, 0.2, 0.3, 0.2],
        Strategy::Consolidation => [0.4, 0.3, 0.1, 0.2],
        Strategy::Balanced => [0.4, 0.25, 0.15, 0.2],
    }
}

/// Weighted sum of the four criteria, before jitter.
pub fn base_score(candidate: &Candidate<'_>, strategy: Strategy) -> f64 {
    let [wc, wr, wd, wa] = strategy_weights(strategy);
    wc * candidate.coverage
        + wr * candidate.relevance
        + wd * candidate.diversity
        + wa * candidate.adaptability
}

/// Mixed-mode allocation ratios per primary strategy, in application order.
fn mixed_ratios(primary: Strategy) -> &'static [(Strategy, f64)] {
    match primary {
        Strategy::GapFilling => &[
            (Strategy::GapFilling, 0.6),
            (Strategy::Consolidation, 0.3),
            (Strategy::Balanced, 0.1),
        ],
        Strategy::Expansion => &[
            (Strategy::GapFilling, 0.2),
            (Strategy::Expansion, 0.6),
            (Strategy::Balanced, 0.2),
        ],
        Strategy::Consolidation => &[
            (Strategy::GapFilling, 0.3),
            (Strategy::Consolidation, 0.5),
            (Strategy::Expansion, 0.2),
        ],
        Strategy::Balanced => &[
            (Strategy::GapFilling, 0.2),
            (Strategy::Consolidation, 0.3),
            (Strategy::Expansion, 0.1),
            (Strategy::Balanced, 0.4),
        ],
    }
}

/// Split `n` across the primary's ratio table: at least 1 per non-zero ratio
/// while budget remains, rounding remainder assigned to the primary.
pub fn allocate(primary: Strategy, n: usize) -> Vec<(Strategy, usize)> {
    let ratios = mixed_ratios(primary);
    let mut remaining = n;
    let mut allocations: Vec<(Strategy, usize)> = Vec::with_capacity(ratios.len());

    for &(strategy, ratio) in ratios {
        let ideal = (n as f64 * ratio).round() as usize;
        let allocated = ideal.max(1).min(remaining);
        allocations.push((strategy, allocated));
        remaining -= allocated;
    }

    if remaining > 0 {
        for entry in allocations.iter_mut() {
            if entry.0 == primary {
                entry.1 += remaining;
                break;
            }
        }
    }

    allocations
}

/// Score, jitter, sort and de-duplicate one strategy's candidates.
fn rank_candidates(
    candidates: Vec<Candidate<'_>>,
    strategy: Strategy,
    n: usize,
    mixed: bool,
    rng: &mut StdRng,
) -> Vec<RecommendedQuestion> {
    let mut scored: Vec<(f64, &Question)> = candidates
        .iter()
        .map(|c| {
            let jitter = rng.gen_range(0.95..1.05);
            (base_score(c, strategy) * jitter, c.question)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(n);
    for (score, question) in scored {
        if out.len() >= n {
            break;
        }
        if !seen.insert(question.qid.clone()) {
            continue;
        }
        out.push(to_recommended(question, strategy.into(), mixed, score));
    }
    out
}

fn to_recommended(
    question: &Question,
    source: StrategySource,
    mixed: bool,
    score: f64,
) -> RecommendedQuestion {
    RecommendedQuestion {
        qid: question.qid.clone(),
        content: question.content.clone(),
        options: question.options.clone(),
        knowledge_points: question.knowledge_points.clone(),
        difficulty: question.difficulty,
        strategy_source: source,
        is_mixed_strategy: mixed,
        score,
    }
}

/// Produce up to `n` recommendations for a learner.
///
/// Cold start (no KP above the cold-start mastery floor) bypasses strategy
/// selection; otherwise the primary strategy runs alone until the learner
/// has enough batches for mixed mode.
pub fn recommend(
    ctx: &GeneratorContext<'_>,
    n: usize,
    call_nonce: u64,
) -> Vec<RecommendedQuestion> {
    if n == 0 {
        return Vec::new();
    }

    if ctx
        .learner
        .mastered(ctx.cfg.cold_start_threshold)
        .is_empty()
    {
        return cold_start(ctx, n);
    }

    let decision = strategy::select(ctx.state);
    tracing::debug!(
        learner_id = %ctx.learner.learner_id(),
        primary = %decision.primary,
        mixed = decision.mixed,
        "Strategy selected"
    );

    let jitter_seed = seed::jitter_seed(
        ctx.learner.learner_id(),
        ctx.learner.batch_count(),
        call_nonce,
    );
    let mut rng = StdRng::seed_from_u64(jitter_seed);

    if !decision.mixed {
        let candidates = generator::candidates(ctx, decision.primary);
        return rank_candidates(candidates, decision.primary, n, false, &mut rng);
    }

    // Mixed mode: run each allocated strategy, merge keeping first
    // occurrence per qid, then top up with balanced if deduplication left
    // the list short.
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<RecommendedQuestion> = Vec::with_capacity(n);

    for (strategy, count) in allocate(decision.primary, n) {
        if count == 0 {
            continue;
        }
        let candidates = generator::candidates(ctx, strategy);
        for rec in rank_candidates(candidates, strategy, count, true, &mut rng) {
            if merged.len() >= n {
                break;
            }
            if seen.insert(rec.qid.clone()) {
                merged.push(rec);
            }
        }
    }

    if merged.len() < n {
        let candidates = generator::candidates(ctx, Strategy::Balanced);
        let top_up = rank_candidates(
            candidates,
            Strategy::Balanced,
            n,
            true,
            &mut rng,
        );
        for rec in top_up {
            if merged.len() >= n {
                break;
            }
            if seen.insert(rec.qid.clone()) {
                merged.push(rec);
            }
        }
    }

    merged
}

/// Cold-start path: introductory-KP questions in bank order, excluding
/// anything already attempted.
fn cold_start(ctx: &GeneratorContext<'_>, n: usize) -> Vec<RecommendedQuestion> {
    let attempted = ctx.learner.attempted_qids();
    let intro: std::collections::HashSet<&str> = ctx
        .cfg
        .introductory_kps
        .iter()
        .map(|s| s.as_str())
        .collect();

    ctx.catalog
        .questions_in_bank_order()
        .filter(|q| !attempted.contains(q.qid.as_str()))
        .filter(|q| {
            q.knowledge_points
                .keys()
                .any(|kp| intro.contains(kp.as_str()))
        })
        .take(n)
        .map(|q| to_recommended(q, StrategySource::ColdStart, false, 0.0))
        .collect()
}

/// Convenience wrapper used by the engine: analyze then recommend.
pub fn recommend_for_learner(
    catalog: &crate::catalog::Catalog,
    relations: &crate::relations::RelationVectors,
    learner: &crate::learner::LearnerState,
    cfg: &crate::config::EngineConfig,
    n: usize,
    call_nonce: u64,
) -> Vec<RecommendedQuestion> {
    let state = analyzer::analyze(learner, catalog, cfg);
    let ctx = GeneratorContext {
        catalog,
        relations,
        learner,
        state: &state,
        cfg,
    };
    recommend(&ctx, n, call_nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn question(qid: &str) -> Question {
        Question {
            qid: qid.to_string(),
            content: "p".to_string(),
            options: ["x".into(), "y".into(), "z".into(), "w".into()],
            answer: "x".to_string(),
            knowledge_points: HashMap::from([("K1".to_string(), 0.9)]),
            difficulty: 0.5,
        }
    }

    #[test]
    fn test_expansion_weighting() {
        let q = question("Q1");
        let candidate = Candidate {
            question: &q,
            target_kp: "K1".to_string(),
            coverage: 0.9,
            relevance: 0.4,
            diversity: 0.2,
            adaptability: 0.7,
        };
        // 0.3*0.9 + 0.2*0.4 + 0.3*0.2 + 0.2*0.7
        assert!((base_score(&candidate, Strategy::Expansion) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_allocation_sums_to_n() {
        for n in 1..=12 {
            for primary in [
                Strategy::GapFilling,
                Strategy::Consolidation,
                Strategy::Expansion,
                Strategy::Balanced,
            ] {
                let total: usize = allocate(primary, n).iter().map(|(_, c)| c).sum();
                assert_eq!(total, n, "primary {:?}, n {}", primary, n);
            }
        }
    }

    #[test]
    fn test_allocation_respects_ratios_for_ten() {
        let alloc = allocate(Strategy::GapFilling, 10);
        assert_eq!(
            alloc,
            vec![
                (Strategy::GapFilling, 6),
                (Strategy::Consolidation, 3),
                (Strategy::Balanced, 1),
            ]
        );
    }

    #[test]
    fn test_allocation_minimum_one_while_available() {
        // n = 2: gap gets round(1.2)=1, consolidation round(0.6)=1, balanced
        // starved (no budget left).
        let alloc = allocate(Strategy::GapFilling, 2);
        assert_eq!(
            alloc,
            vec![
                (Strategy::GapFilling, 1),
                (Strategy::Consolidation, 1),
                (Strategy::Balanced, 0),
            ]
        );
    }
}
