/// Answer grading: maps a learner's selected letter to a correctness verdict.
///
/// The letter is resolved to the option text by position (A..D, case
/// insensitive) and compared against the question's stored correct option
/// text. Grading is pure — it never touches learner state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::RecError;

/// One answer in a submission: the question and the chosen letter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub qid: String,
    pub selected: String,
}

/// A graded answer, also the unit of the learner's answer history.
///
/// `kp_weights` is a snapshot of the question's weight map at grading time,
/// so history survives later bank edits when re-imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub qid: String,
    pub selected_letter: char,
    pub selected_option: String,
    pub correct_option: String,
    pub is_correct: bool,
    pub kp_weights: HashMap<String, f64>,
}

/// Resolve a raw letter input to an option index.
fn letter_index(selected: &str) -> Result<usize, RecError> {
    let trimmed = selected.trim();
    let mut chars = trimmed.chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_ascii_uppercase(),
        _ => return Err(RecError::BadLetter(selected.to_string())),
    };
    match letter {
        'A' => Ok(0),
        'B' => Ok(1),
        'C' => Ok(2),
        'D' => Ok(3),
        _ => Err(RecError::BadLetter(selected.to_string())),
    }
}

/// Grade a single submission against the catalog.
pub fn grade(catalog: &Catalog, qid: &str, selected: &str) -> Result<GradedAnswer, RecError> {
    let question = catalog.question(qid)?;
    let index = letter_index(selected)?;
    let selected_option = question.options[index].clone();
    let is_correct = selected_option == question.answer;

    Ok(GradedAnswer {
        qid: question.qid.clone(),
        selected_letter: (b'A' + index as u8) as char,
        selected_option,
        correct_option: question.answer.clone(),
        is_correct,
        kp_weights: question.knowledge_points.clone(),
    })
}

/// Grade a whole submission list. Fails fast on the first bad item so the
/// caller can reject the batch before any state changes.
pub fn grade_batch(
    catalog: &Catalog,
    submissions: &[AnswerSubmission],
) -> Result<Vec<GradedAnswer>, RecError> {
    submissions
        .iter()
        .map(|s| grade(catalog, &s.qid, &s.selected))
        .collect()
}
