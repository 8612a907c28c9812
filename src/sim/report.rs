/// Simulation report output: stdout table plus optional JSON file.

use std::path::Path;

use super::SimReport;
use crate::errors::RecError;

/// Print a human-readable run summary to stdout.
pub fn print_report(report: &SimReport) {
    println!("=== kgrec simulation {} ===", report.run_id);
    println!(
        "learners: {}  batches: {}  questions/batch: {}  seed: {}",
        report.config.learners,
        report.config.batches,
        report.config.questions_per_batch,
        report.config.seed
    );
    println!();

    println!(
        "{:<12} {:>8} {:>9} {:>14} {:>10}",
        "learner", "profile", "answered", "avg mastery", "mastered"
    );
    for learner in &report.learners {
        let answered: usize = learner.batches.iter().map(|b| b.recommended).sum();
        println!(
            "{:<12} {:>8.2} {:>9} {:>14.3} {:>10}",
            learner.learner_id,
            learner.accuracy_profile,
            answered,
            learner.final_average_mastery,
            learner.final_mastered_count
        );
    }

    println!();
    println!("strategy distribution:");
    for (strategy, count) in &report.strategy_distribution {
        println!("  {:<15} {}", strategy, count);
    }
    println!();
    println!("total questions answered: {}", report.total_questions_answered);
}

/// Save the full report as pretty-printed JSON.
pub fn save_report(report: &SimReport, path: &Path) -> Result<(), RecError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| RecError::Storage(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}
