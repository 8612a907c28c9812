/// End-to-end tests against an in-memory catalog: the six literal scenarios
/// plus the testable properties (mastery bounds, vector norm, history
/// consistency, no-repeat recommendations, grading round-trip, persistence
/// round-trip, determinism, cold start, mixed-strategy coverage).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use kgrec::catalog::{Catalog, Question};
use kgrec::config::EngineConfig;
use kgrec::engine::RecommendationEngine;
use kgrec::errors::RecError;
use kgrec::grader::AnswerSubmission;
use kgrec::recommend::StrategySource;

const DIM: usize = 8;

fn basis(i: usize) -> Vec<f64> {
    let mut v = vec![0.0; DIM];
    v[i] = 1.0;
    v
}

fn blend(i: usize, j: usize, wi: f64, wj: f64) -> Vec<f64> {
    let mut v = vec![0.0; DIM];
    v[i] = wi;
    v[j] = wj;
    v
}

fn question(
    qid: &str,
    answer_pos: usize,
    weights: &[(&str, f64)],
    difficulty: f64,
) -> Question {
    let options = ["x", "y", "z", "w"];
    Question {
        qid: qid.to_string(),
        content: format!("prompt for {}", qid),
        options: options.map(|s| s.to_string()),
        answer: options[answer_pos].to_string(),
        knowledge_points: weights.iter().map(|(k, w)| (k.to_string(), *w)).collect(),
        difficulty,
    }
}

/// Eight KPs; K4 is close to K1 (cos 0.8) and K6 to K2 (cos 0.6) so the
/// connectivity heuristics have structure to find.
fn embeddings() -> Vec<(String, Vec<f64>)> {
    vec![
        ("K1".to_string(), basis(0)),
        ("K2".to_string(), basis(1)),
        ("K3".to_string(), basis(2)),
        ("K4".to_string(), blend(0, 3, 0.8, 0.6)),
        ("K5".to_string(), basis(4)),
        ("K6".to_string(), blend(1, 5, 0.6, 0.8)),
        ("K7".to_string(), basis(6)),
        ("K8".to_string(), basis(7)),
    ]
}

fn full_catalog() -> Catalog {
    let questions = vec![
        question("Q1", 0, &[("K1", 1.0)], 0.3),
        question("Q2", 0, &[("K2", 1.0)], 0.3),
        question("Q3", 2, &[("K3", 1.0)], 0.4),
        question("Q4", 0, &[("K4", 0.9)], 0.4),
        question("Q5", 0, &[("K4", 0.5), ("K5", 0.5)], 0.6),
        question("Q6", 0, &[("K6", 0.8), ("K2", 0.2)], 0.5),
        question("Q7", 0, &[("K8", 1.0)], 0.7),
        question("Q8", 0, &[("K1", 0.7), ("K3", 0.3)], 0.4),
        question("Q9", 0, &[("K2", 0.6), ("K6", 0.4)], 0.5),
        question("Q10", 0, &[("K5", 1.0)], 0.6),
        question("Q11", 0, &[("K7", 1.0)], 0.5),
        question("Q12", 0, &[("K4", 0.6), ("K1", 0.4)], 0.5),
    ];
    let names = HashMap::from([
        ("K1".to_string(), "Set operations".to_string()),
        ("K2".to_string(), "Relations and mappings".to_string()),
    ]);
    Catalog::new(embeddings(), names, questions, vec![]).unwrap()
}

fn engine() -> RecommendationEngine {
    RecommendationEngine::new(Arc::new(full_catalog()), EngineConfig::default())
}

fn submission(qid: &str, letter: &str) -> AnswerSubmission {
    AnswerSubmission {
        qid: qid.to_string(),
        selected: letter.to_string(),
    }
}

// --- Scenario A: bounded mastery -----------------------------------------

#[tokio::test]
async fn scenario_a_mastery_is_bounded() {
    let engine = engine();
    engine
        .create_learner("a", Some(BTreeMap::from([("K1".to_string(), 0.9)])))
        .await
        .unwrap();

    let summary = engine
        .submit_answers("a", &[submission("Q1", "A")])
        .await
        .unwrap();

    assert_eq!(summary.batch_completed, 1);
    assert_eq!(summary.mastery.get("K1"), Some(&1.0));
    assert!(summary.answers[0].is_correct);

    let status = engine.get_status("a").await.unwrap();
    assert_eq!(status.batch_count, 1);
    assert!(status.mastery.values().all(|&m| (0.0..=1.0).contains(&m)));
    assert!((status.vector_norm - 1.0).abs() < 1e-6);
}

// --- Scenario B / property 8: cold start ----------------------------------

#[tokio::test]
async fn scenario_b_cold_start_serves_introductory_questions_in_bank_order() {
    // Bank where only Q1 (K1) and Q2 (K2) touch the introductory set.
    let catalog = Catalog::new(
        embeddings(),
        HashMap::new(),
        vec![
            question("Q1", 0, &[("K1", 1.0)], 0.3),
            question("Q2", 0, &[("K2", 1.0)], 0.3),
            question("Q7", 0, &[("K8", 1.0)], 0.7),
        ],
        vec![],
    )
    .unwrap();
    let engine = RecommendationEngine::new(Arc::new(catalog), EngineConfig::default());
    engine.create_learner("cold", None).await.unwrap();

    let recs = engine.get_recommendations("cold", 3).await.unwrap();
    let qids: Vec<&str> = recs.iter().map(|r| r.qid.as_str()).collect();
    assert_eq!(qids, vec!["Q1", "Q2"]);
    assert!(recs
        .iter()
        .all(|r| r.strategy_source == StrategySource::ColdStart));
    assert!(recs.iter().all(|r| !r.is_mixed_strategy));
}

// --- Scenario F: bad input leaves state untouched --------------------------

#[tokio::test]
async fn scenario_f_unknown_question_does_not_mutate() {
    let engine = engine();
    engine
        .create_learner("f", Some(BTreeMap::from([("K1".to_string(), 0.5)])))
        .await
        .unwrap();

    let err = engine
        .submit_answers("f", &[submission("Q999", "A")])
        .await
        .unwrap_err();
    assert!(matches!(err, RecError::UnknownQuestion(_)));

    let status = engine.get_status("f").await.unwrap();
    assert_eq!(status.batch_count, 0);
    assert_eq!(status.total_answers, 0);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let engine = engine();
    engine.create_learner("e", None).await.unwrap();
    assert!(matches!(
        engine.submit_answers("e", &[]).await,
        Err(RecError::EmptyBatch)
    ));
}

#[tokio::test]
async fn bad_letter_is_rejected_without_mutation() {
    let engine = engine();
    engine.create_learner("bl", None).await.unwrap();
    let err = engine
        .submit_answers("bl", &[submission("Q1", "E")])
        .await
        .unwrap_err();
    assert!(matches!(err, RecError::BadLetter(_)));
    assert_eq!(engine.get_status("bl").await.unwrap().batch_count, 0);
}

// --- Property 5: grading round-trip ---------------------------------------

#[tokio::test]
async fn grading_round_trip_all_letters() {
    let engine = engine();
    // Q3's correct option sits at position C.
    let graded = engine
        .check_answers(&[submission("Q3", "C")])
        .unwrap();
    assert!(graded[0].is_correct);
    assert_eq!(graded[0].selected_letter, 'C');

    for wrong in ["A", "B", "D"] {
        let graded = engine.check_answers(&[submission("Q3", wrong)]).unwrap();
        assert!(!graded[0].is_correct, "letter {} should be wrong", wrong);
    }
}

// --- Properties 1-3: invariants across a multi-batch run -------------------

#[tokio::test]
async fn invariants_hold_across_batches() {
    let engine = engine();
    engine
        .create_learner(
            "inv",
            Some(BTreeMap::from([
                ("K1".to_string(), 0.15),
                ("K2".to_string(), 0.12),
                ("K4".to_string(), 0.6),
            ])),
        )
        .await
        .unwrap();

    let batches: Vec<Vec<AnswerSubmission>> = vec![
        vec![submission("Q1", "A"), submission("Q2", "B")],
        vec![submission("Q4", "A")],
        vec![submission("Q6", "D"), submission("Q9", "A"), submission("Q3", "C")],
    ];
    let mut total_answers = 0;
    for batch in &batches {
        total_answers += batch.len();
        engine.submit_answers("inv", batch).await.unwrap();

        let status = engine.get_status("inv").await.unwrap();
        assert!(status.mastery.values().all(|&m| (0.0..=1.0).contains(&m)));
        assert!((status.vector_norm - 1.0).abs() < 1e-6);
    }

    let status = engine.get_status("inv").await.unwrap();
    assert_eq!(status.batch_count, 3);
    assert_eq!(status.total_answers, total_answers);

    let snapshot = engine.export("inv").await.unwrap();
    assert_eq!(
        snapshot.vector_history.len() as u64,
        snapshot.batch_count + 1
    );
}

// --- Property 4: no repeat recommendations ---------------------------------

#[tokio::test]
async fn recommendations_never_repeat_attempted_questions() {
    let engine = engine();
    engine
        .create_learner(
            "rep",
            Some(BTreeMap::from([
                ("K1".to_string(), 0.15),
                ("K2".to_string(), 0.12),
                ("K4".to_string(), 0.6),
                ("K6".to_string(), 0.35),
            ])),
        )
        .await
        .unwrap();

    let mut attempted: HashSet<String> = HashSet::new();
    for round in 0..4 {
        let recs = engine
            .get_recommendations_seeded("rep", 3, round)
            .await
            .unwrap();
        for rec in &recs {
            assert!(
                !attempted.contains(&rec.qid),
                "round {}: {} was already attempted",
                round,
                rec.qid
            );
        }
        if recs.is_empty() {
            break;
        }
        let batch: Vec<AnswerSubmission> = recs
            .iter()
            .map(|r| submission(&r.qid, "A"))
            .collect();
        engine.submit_answers("rep", &batch).await.unwrap();
        attempted.extend(recs.into_iter().map(|r| r.qid));
    }
}

// --- Property 7: determinism -----------------------------------------------

#[tokio::test]
async fn identical_engines_produce_identical_rankings() {
    async fn run() -> Vec<(String, f64)> {
        let engine = engine();
        engine
            .create_learner(
                "det",
                Some(BTreeMap::from([
                    ("K1".to_string(), 0.15),
                    ("K4".to_string(), 0.6),
                    ("K6".to_string(), 0.35),
                ])),
            )
            .await
            .unwrap();
        engine
            .submit_answers("det", &[submission("Q1", "A"), submission("Q2", "A")])
            .await
            .unwrap();
        engine
            .get_recommendations_seeded("det", 3, 12345)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.qid, r.score))
            .collect()
    }

    let first = run().await;
    let second = run().await;
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

// --- Scenario E / property 6: persistence round-trip -----------------------

#[tokio::test]
async fn scenario_e_persistence_round_trip() {
    let engine = engine();
    engine
        .create_learner(
            "p",
            Some(BTreeMap::from([
                ("K1".to_string(), 0.15),
                ("K4".to_string(), 0.6),
            ])),
        )
        .await
        .unwrap();
    engine
        .submit_answers("p", &[submission("Q1", "A"), submission("Q2", "B")])
        .await
        .unwrap();
    engine
        .submit_answers("p", &[submission("Q4", "A")])
        .await
        .unwrap();

    let before_status = engine.get_status("p").await.unwrap();
    let before_recs = engine.get_recommendations_seeded("p", 3, 999).await.unwrap();

    let snapshot = engine.export("p").await.unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(engine.clear_all().await, 1);
    assert!(matches!(
        engine.get_status("p").await,
        Err(RecError::UnknownLearner(_))
    ));

    let imported_id = engine.import(value).await.unwrap();
    assert_eq!(imported_id, "p");

    let after_status = engine.get_status("p").await.unwrap();
    assert_eq!(after_status.batch_count, before_status.batch_count);
    assert_eq!(after_status.mastery, before_status.mastery);
    assert_eq!(after_status.mastered, before_status.mastered);

    let after_recs = engine.get_recommendations_seeded("p", 3, 999).await.unwrap();
    let before_qids: Vec<&str> = before_recs.iter().map(|r| r.qid.as_str()).collect();
    let after_qids: Vec<&str> = after_recs.iter().map(|r| r.qid.as_str()).collect();
    assert_eq!(before_qids, after_qids);
}

#[tokio::test]
async fn export_all_import_all_round_trip() {
    let engine = engine();
    engine.create_learner("x", None).await.unwrap();
    engine
        .create_learner("y", Some(BTreeMap::from([("K4".to_string(), 0.7)])))
        .await
        .unwrap();

    let snapshots = engine.export_all().await;
    assert_eq!(snapshots.len(), 2);

    let values: Vec<serde_json::Value> = snapshots
        .iter()
        .map(|s| serde_json::to_value(s).unwrap())
        .collect();

    let report = engine.import_all(values).await;
    assert_eq!(report.imported.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(engine.list().await.len(), 2);
}

#[tokio::test]
async fn import_all_collects_failures() {
    let engine = engine();
    let good = serde_json::json!({
        "version": "1.1",
        "learner_id": "ok",
        "mastery": {"K1": 0.5},
        "answer_history": [],
    });
    let bad = serde_json::json!({ "mastery": {} });

    let report = engine.import_all(vec![good, bad]).await;
    assert_eq!(report.imported, vec!["ok"]);
    assert_eq!(report.failed.len(), 1);
}

// --- Property 9: mixed-strategy coverage -----------------------------------

#[tokio::test]
async fn mixed_mode_engages_after_four_batches() {
    let engine = engine();
    engine
        .create_learner(
            "mix",
            Some(BTreeMap::from([
                ("K1".to_string(), 0.2),
                ("K2".to_string(), 0.1),
                ("K4".to_string(), 0.6),
                ("K6".to_string(), 0.4),
            ])),
        )
        .await
        .unwrap();

    for (qid, letter) in [("Q1", "A"), ("Q2", "A"), ("Q3", "C"), ("Q4", "A")] {
        engine
            .submit_answers("mix", &[submission(qid, letter)])
            .await
            .unwrap();
    }

    let recs = engine.get_recommendations_seeded("mix", 3, 7).await.unwrap();
    assert_eq!(recs.len(), 3);
    assert!(recs.iter().all(|r| r.is_mixed_strategy));
    assert!(recs
        .iter()
        .all(|r| r.strategy_source != StrategySource::ColdStart));

    let attempted: HashSet<&str> = ["Q1", "Q2", "Q3", "Q4"].into_iter().collect();
    assert!(recs.iter().all(|r| !attempted.contains(r.qid.as_str())));

    let unique: HashSet<&str> = recs.iter().map(|r| r.qid.as_str()).collect();
    assert_eq!(unique.len(), recs.len());
}

// --- Registry and report surfaces ------------------------------------------

#[tokio::test]
async fn duplicate_learner_is_rejected() {
    let engine = engine();
    engine.create_learner("dup", None).await.unwrap();
    assert!(matches!(
        engine.create_learner("dup", None).await,
        Err(RecError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn unknown_learner_operations_fail() {
    let engine = engine();
    assert!(matches!(
        engine.get_recommendations("ghost", 3).await,
        Err(RecError::UnknownLearner(_))
    ));
    assert!(matches!(
        engine.export("ghost").await,
        Err(RecError::UnknownLearner(_))
    ));
}

#[tokio::test]
async fn weak_point_report_names_and_advice() {
    let engine = engine();
    engine
        .create_learner(
            "w",
            Some(BTreeMap::from([
                ("K1".to_string(), 0.05),
                ("K2".to_string(), 0.25),
                ("K4".to_string(), 0.6),
            ])),
        )
        .await
        .unwrap();

    let report = engine.get_weak_points("w", None).await.unwrap();
    assert_eq!(report.threshold, 0.3);
    let ids: Vec<&str> = report.weak_points.iter().map(|w| w.kp_id.as_str()).collect();
    assert_eq!(ids, vec!["K1", "K2"]);
    // Display names come from the name table, falling back to the id.
    assert_eq!(report.weak_points[0].name, "Set operations");
    assert!(!report.advice.is_empty());
    assert_eq!(report.summary.mastered, 1);
    assert_eq!(report.summary.weak, 2);
}

#[tokio::test]
async fn listing_reports_progress() {
    let engine = engine();
    engine.create_learner("l1", None).await.unwrap();
    engine
        .create_learner("l2", Some(BTreeMap::from([("K4".to_string(), 0.8)])))
        .await
        .unwrap();

    let listing = engine.list().await;
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].learner_id, "l1");
    let l2 = &listing[1];
    assert_eq!(l2.mastered_count, 1);
    assert!((l2.average_mastery - 0.8).abs() < 1e-12);
}

#[tokio::test]
async fn initial_mastery_with_unknown_kp_is_rejected() {
    let engine = engine();
    assert!(matches!(
        engine
            .create_learner("bad", Some(BTreeMap::from([("K99".to_string(), 0.4)])))
            .await,
        Err(RecError::UnknownKp(_))
    ));
}
