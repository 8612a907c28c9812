/// Simulation loop: create learners, then recommend → answer → submit for
/// the configured number of batches.

use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{default_profiles, BatchMetrics, LearnerReport, SimConfig, SimReport};
use crate::engine::RecommendationEngine;
use crate::errors::RecError;
use crate::grader::AnswerSubmission;
use crate::recommend::RecommendedQuestion;
use crate::seed;

/// Run one simulation against a fresh set of learners.
pub async fn run_simulation(
    engine: &RecommendationEngine,
    config: &SimConfig,
) -> Result<SimReport, RecError> {
    let profiles = default_profiles(config.learners);
    let mut strategy_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut learner_reports = Vec::with_capacity(profiles.len());
    let mut total_answered = 0usize;

    let pb = ProgressBar::new((config.learners * config.batches) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{pos}/{len}] {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for profile in &profiles {
        engine.create_learner(&profile.learner_id, None).await?;
        // Answer choices are seeded per learner so runs reproduce exactly.
        let mut rng = StdRng::seed_from_u64(
            config.seed ^ seed::fnv1a_64(profile.learner_id.as_bytes()),
        );

        let mut batches = Vec::with_capacity(config.batches);
        for batch in 0..config.batches {
            pb.set_message(format!("{} batch {}", profile.learner_id, batch + 1));

            let nonce = config.seed ^ batch as u64;
            let recommendations = engine
                .get_recommendations_seeded(
                    &profile.learner_id,
                    config.questions_per_batch,
                    nonce,
                )
                .await?;
            if recommendations.is_empty() {
                tracing::info!(
                    learner_id = %profile.learner_id,
                    batch,
                    "Question pool exhausted, stopping learner early"
                );
                pb.inc((config.batches - batch) as u64);
                break;
            }

            for rec in &recommendations {
                *strategy_distribution
                    .entry(rec.strategy_source.as_str().to_string())
                    .or_insert(0) += 1;
            }

            let submissions: Vec<AnswerSubmission> = recommendations
                .iter()
                .map(|rec| AnswerSubmission {
                    qid: rec.qid.clone(),
                    selected: choose_answer(engine, rec, profile.accuracy, &mut rng),
                })
                .collect();

            let summary = engine
                .submit_answers(&profile.learner_id, &submissions)
                .await?;
            total_answered += summary.answers.len();

            let status = engine.get_status(&profile.learner_id).await?;
            let average_mastery = if status.mastery.is_empty() {
                0.0
            } else {
                status.mastery.values().sum::<f64>() / status.mastery.len() as f64
            };
            batches.push(BatchMetrics {
                batch: batch + 1,
                recommended: summary.answers.len(),
                correct: summary.correct_count,
                accuracy: summary.correct_count as f64 / summary.answers.len() as f64,
                average_mastery,
            });
            pb.inc(1);
        }

        let status = engine.get_status(&profile.learner_id).await?;
        learner_reports.push(LearnerReport {
            learner_id: profile.learner_id.clone(),
            accuracy_profile: profile.accuracy,
            batches,
            final_average_mastery: if status.mastery.is_empty() {
                0.0
            } else {
                status.mastery.values().sum::<f64>() / status.mastery.len() as f64
            },
            final_mastered_count: status.mastered.len(),
        });
    }

    pb.finish_with_message("done");

    Ok(SimReport {
        run_id: uuid::Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now(),
        config: config.clone(),
        learners: learner_reports,
        strategy_distribution,
        total_questions_answered: total_answered,
    })
}

/// Pick a letter: the correct one with probability `accuracy`, otherwise a
/// uniformly chosen wrong letter.
fn choose_answer(
    engine: &RecommendationEngine,
    rec: &RecommendedQuestion,
    accuracy: f64,
    rng: &mut StdRng,
) -> String {
    let correct_index = engine
        .catalog()
        .question(&rec.qid)
        .ok()
        .and_then(|q| q.options.iter().position(|opt| opt == &q.answer))
        .unwrap_or(0);

    let index = if rng.gen_bool(accuracy.clamp(0.0, 1.0)) {
        correct_index
    } else {
        // Shift by 1..=3 positions to land on a wrong option.
        (correct_index + rng.gen_range(1..4)) % 4
    };
    ((b'A' + index as u8) as char).to_string()
}
