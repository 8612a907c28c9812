/// Startup ingestion of the four external catalog inputs (CSV + JSON).
///
/// Formats (produced offline, never written by this crate):
/// - embeddings.csv: first column kp_id, then D float columns
/// - knowledge_graph.csv: source_name, source_id, relation, target_name, target_id
/// - question_bank.json: { "questions": [ ... ] }
/// - kp_names.csv: kp_id, name

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{Catalog, KgEdge, Question, RelationLabel};
use crate::config::DataPaths;
use crate::errors::RecError;

/// Load and validate the full catalog from the configured paths.
pub fn load_catalog(paths: &DataPaths) -> Result<Catalog, RecError> {
    let embeddings = load_embeddings(&paths.embeddings)?;
    let names = load_kp_names(&paths.kp_names)?;
    let questions = load_question_bank(&paths.question_bank)?;
    let edges = load_edges(&paths.knowledge_graph)?;

    let catalog = Catalog::new(embeddings, names, questions, edges)?;
    tracing::info!(
        kps = catalog.kp_count(),
        questions = catalog.question_count(),
        edges = catalog.edges().len(),
        dim = catalog.dim(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Parse the embeddings table: one row per KP, kp_id then D floats.
pub fn load_embeddings(path: impl AsRef<Path>) -> Result<Vec<(String, Vec<f64>)>, RecError> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| RecError::CorruptCatalog(format!("embeddings table: {}", e)))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let kp_id = fields
            .next()
            .ok_or_else(|| RecError::CorruptCatalog("embeddings table: empty row".to_string()))?
            .to_string();
        let mut vector = Vec::with_capacity(record.len().saturating_sub(1));
        for field in fields {
            let value: f64 = field.parse().map_err(|_| {
                RecError::CorruptCatalog(format!(
                    "embeddings table: non-numeric value '{}' for '{}'",
                    field, kp_id
                ))
            })?;
            vector.push(value);
        }
        rows.push((kp_id, vector));
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    #[allow(dead_code)]
    source_name: String,
    source_id: String,
    relation: String,
    #[allow(dead_code)]
    target_name: String,
    target_id: String,
}

/// Parse the KG edge table.
pub fn load_edges(path: impl AsRef<Path>) -> Result<Vec<KgEdge>, RecError> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| RecError::CorruptCatalog(format!("edge table: {}", e)))?;

    let mut edges = Vec::new();
    for row in reader.deserialize::<EdgeRow>() {
        let row = row?;
        edges.push(KgEdge {
            source: row.source_id,
            target: row.target_id,
            relation: RelationLabel::parse(&row.relation)?,
        });
    }
    Ok(edges)
}

#[derive(Debug, Deserialize)]
struct NameRow {
    kp_id: String,
    name: String,
}

/// Parse the KP display-name table.
pub fn load_kp_names(path: impl AsRef<Path>) -> Result<HashMap<String, String>, RecError> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| RecError::CorruptCatalog(format!("name table: {}", e)))?;

    let mut names = HashMap::new();
    for row in reader.deserialize::<NameRow>() {
        let row = row?;
        names.insert(row.kp_id, row.name);
    }
    Ok(names)
}

#[derive(Debug, Deserialize)]
struct QuestionBankFile {
    questions: Vec<QuestionRow>,
}

#[derive(Debug, Deserialize)]
struct QuestionRow {
    qid: String,
    content: String,
    options: Vec<String>,
    answer: String,
    knowledge_points: HashMap<String, f64>,
    #[serde(default = "default_difficulty")]
    difficulty: f64,
}

fn default_difficulty() -> f64 {
    0.5
}

/// Parse the question bank JSON, preserving bank order.
pub fn load_question_bank(path: impl AsRef<Path>) -> Result<Vec<Question>, RecError> {
    let raw = std::fs::read_to_string(path.as_ref())
        .map_err(|e| RecError::CorruptCatalog(format!("question bank: {}", e)))?;
    let file: QuestionBankFile = serde_json::from_str(&raw)
        .map_err(|e| RecError::CorruptCatalog(format!("question bank: {}", e)))?;

    let mut questions = Vec::with_capacity(file.questions.len());
    for row in file.questions {
        let options: [String; 4] = row.options.try_into().map_err(|v: Vec<String>| {
            RecError::CorruptCatalog(format!(
                "question '{}': expected 4 options, found {}",
                row.qid,
                v.len()
            ))
        })?;
        questions.push(Question {
            qid: row.qid,
            content: row.content,
            options,
            answer: row.answer,
            knowledge_points: row.knowledge_points,
            difficulty: row.difficulty,
        });
    }
    Ok(questions)
}
