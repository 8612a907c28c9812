/// Knowledge-graph catalog: the immutable read side of the recommender.
///
/// Holds unit-normalized KP embeddings, the KP display-name table, the
/// question bank (with a bank-order index and a KP → questions inverted
/// index), and the KG edge list. Built once at startup, then shared
/// read-only across threads. All violations found during construction are
/// reported as CorruptCatalog and are fatal.

pub mod loader;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::RecError;
use crate::vecmath;

/// Relation labels carried by KG edges. Closed set: used for diagnostic
/// reporting and connectivity heuristics, not for graph traversal in the
/// recommendation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationLabel {
    IsPrerequisiteFor,
    IsRelatedTo,
}

impl RelationLabel {
    pub fn parse(s: &str) -> Result<Self, RecError> {
        match s {
            "is_prerequisite_for" => Ok(RelationLabel::IsPrerequisiteFor),
            "is_related_to" => Ok(RelationLabel::IsRelatedTo),
            other => Err(RecError::CorruptCatalog(format!(
                "unknown edge relation '{}'",
                other
            ))),
        }
    }
}

/// A directed edge of the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgEdge {
    pub source: String,
    pub target: String,
    pub relation: RelationLabel,
}

/// A multiple-choice question. Immutable at runtime.
///
/// `answer` stores the correct option's text, not its letter. Weights in
/// `knowledge_points` express how strongly the question exercises each KP;
/// they need not sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub qid: String,
    pub content: String,
    pub options: [String; 4],
    pub answer: String,
    pub knowledge_points: HashMap<String, f64>,
    pub difficulty: f64,
}

/// Immutable catalog serving O(1) average lookups.
#[derive(Debug)]
pub struct Catalog {
    dim: usize,
    embeddings: HashMap<String, Vec<f64>>,
    /// Catalog KP ids, sorted, for deterministic iteration.
    kp_ids: Vec<String>,
    names: HashMap<String, String>,
    questions: HashMap<String, Question>,
    /// qids in bank order (the order questions were loaded).
    question_order: Vec<String>,
    /// KP id -> qids referencing it, in bank order.
    by_kp: HashMap<String, Vec<String>>,
    edges: Vec<KgEdge>,
}

impl Catalog {
    /// Assemble and validate a catalog from already-parsed parts.
    ///
    /// Embeddings are L2-normalized here; a zero embedding row is corrupt.
    /// Question order is preserved as bank order.
    pub fn new(
        embeddings: Vec<(String, Vec<f64>)>,
        names: HashMap<String, String>,
        questions: Vec<Question>,
        edges: Vec<KgEdge>,
    ) -> Result<Self, RecError> {
        let dim = match embeddings.first() {
            Some((_, v)) if !v.is_empty() => v.len(),
            _ => {
                return Err(RecError::CorruptCatalog(
                    "embeddings table is empty".to_string(),
                ))
            }
        };

        let mut emb_map: HashMap<String, Vec<f64>> = HashMap::with_capacity(embeddings.len());
        for (kp_id, mut vector) in embeddings {
            if vector.len() != dim {
                return Err(RecError::CorruptCatalog(format!(
                    "embedding for '{}' has dimension {}, expected {}",
                    kp_id,
                    vector.len(),
                    dim
                )));
            }
            if vecmath::l2_norm(&vector) == 0.0 {
                return Err(RecError::CorruptCatalog(format!(
                    "embedding for '{}' is the zero vector",
                    kp_id
                )));
            }
            vecmath::normalize(&mut vector);
            if emb_map.insert(kp_id.clone(), vector).is_some() {
                return Err(RecError::CorruptCatalog(format!(
                    "duplicate embedding row for '{}'",
                    kp_id
                )));
            }
        }

        let mut kp_ids: Vec<String> = emb_map.keys().cloned().collect();
        kp_ids.sort();

        let mut question_map: HashMap<String, Question> = HashMap::with_capacity(questions.len());
        let mut question_order: Vec<String> = Vec::with_capacity(questions.len());
        let mut by_kp: HashMap<String, Vec<String>> = HashMap::new();

        for q in questions {
            if question_map.contains_key(&q.qid) {
                return Err(RecError::CorruptCatalog(format!(
                    "duplicate question id '{}'",
                    q.qid
                )));
            }
            validate_question(&q, &emb_map)?;
            for kp_id in q.knowledge_points.keys() {
                by_kp
                    .entry(kp_id.clone())
                    .or_default()
                    .push(q.qid.clone());
            }
            question_order.push(q.qid.clone());
            question_map.insert(q.qid.clone(), q);
        }

        for edge in &edges {
            if !emb_map.contains_key(&edge.source) {
                return Err(RecError::CorruptCatalog(format!(
                    "edge source '{}' has no embedding",
                    edge.source
                )));
            }
            if !emb_map.contains_key(&edge.target) {
                return Err(RecError::CorruptCatalog(format!(
                    "edge target '{}' has no embedding",
                    edge.target
                )));
            }
        }

        Ok(Catalog {
            dim,
            embeddings: emb_map,
            kp_ids,
            names,
            questions: question_map,
            question_order,
            by_kp,
            edges,
        })
    }

    /// Embedding dimension D.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Unit-normalized embedding for a KP.
    pub fn embedding(&self, kp_id: &str) -> Result<&[f64], RecError> {
        self.embeddings
            .get(kp_id)
            .map(|v| v.as_slice())
            .ok_or_else(|| RecError::UnknownKp(kp_id.to_string()))
    }

    /// Non-failing embedding lookup.
    pub fn embedding_opt(&self, kp_id: &str) -> Option<&[f64]> {
        self.embeddings.get(kp_id).map(|v| v.as_slice())
    }

    pub fn contains_kp(&self, kp_id: &str) -> bool {
        self.embeddings.contains_key(kp_id)
    }

    /// All KP ids, sorted.
    pub fn kp_ids(&self) -> &[String] {
        &self.kp_ids
    }

    /// Display name for a KP; falls back to the id when the name table has
    /// no entry.
    pub fn name<'a>(&'a self, kp_id: &'a str) -> &'a str {
        self.names.get(kp_id).map(|s| s.as_str()).unwrap_or(kp_id)
    }

    pub fn question(&self, qid: &str) -> Result<&Question, RecError> {
        self.questions
            .get(qid)
            .ok_or_else(|| RecError::UnknownQuestion(qid.to_string()))
    }

    pub fn contains_question(&self, qid: &str) -> bool {
        self.questions.contains_key(qid)
    }

    /// Questions referencing a KP, in bank order. Unknown KPs yield an empty
    /// iterator (the weight maps were validated at load, so an unknown KP
    /// simply has no questions).
    pub fn questions_with(&self, kp_id: &str) -> impl Iterator<Item = &Question> {
        self.by_kp
            .get(kp_id)
            .map(|qids| qids.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |qid| self.questions.get(qid))
    }

    /// All questions in bank order.
    pub fn questions_in_bank_order(&self) -> impl Iterator<Item = &Question> {
        self.question_order
            .iter()
            .filter_map(move |qid| self.questions.get(qid))
    }

    pub fn question_count(&self) -> usize {
        self.question_order.len()
    }

    pub fn kp_count(&self) -> usize {
        self.kp_ids.len()
    }

    pub fn edges(&self) -> &[KgEdge] {
        &self.edges
    }
}

fn validate_question(q: &Question, embeddings: &HashMap<String, Vec<f64>>) -> Result<(), RecError> {
    if !q.options.iter().any(|opt| opt == &q.answer) {
        return Err(RecError::CorruptCatalog(format!(
            "question '{}': stored answer does not match any option",
            q.qid
        )));
    }
    if q.knowledge_points.is_empty() {
        return Err(RecError::CorruptCatalog(format!(
            "question '{}': empty knowledge point weight map",
            q.qid
        )));
    }
    for (kp_id, weight) in &q.knowledge_points {
        if !embeddings.contains_key(kp_id) {
            return Err(RecError::CorruptCatalog(format!(
                "question '{}': references unknown KP '{}'",
                q.qid, kp_id
            )));
        }
        if !(0.0..=1.0).contains(weight) {
            return Err(RecError::CorruptCatalog(format!(
                "question '{}': weight {} for '{}' outside [0, 1]",
                q.qid, weight, kp_id
            )));
        }
    }
    if !(0.0..=1.0).contains(&q.difficulty) {
        return Err(RecError::CorruptCatalog(format!(
            "question '{}': difficulty {} outside [0, 1]",
            q.qid, q.difficulty
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(id: &str, v: Vec<f64>) -> (String, Vec<f64>) {
        (id.to_string(), v)
    }

    fn question(qid: &str, kp_id: &str) -> Question {
        Question {
            qid: qid.to_string(),
            content: format!("prompt {}", qid),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            answer: "a".to_string(),
            knowledge_points: HashMap::from([(kp_id.to_string(), 1.0)]),
            difficulty: 0.5,
        }
    }

    #[test]
    fn test_embeddings_are_normalized() {
        let catalog = Catalog::new(
            vec![kp("K1", vec![3.0, 4.0]), kp("K2", vec![0.0, 2.0])],
            HashMap::new(),
            vec![question("Q1", "K1")],
            vec![],
        )
        .unwrap();
        let e = catalog.embedding("K1").unwrap();
        assert!((crate::vecmath::l2_norm(e) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let catalog = Catalog::new(
            vec![kp("K1", vec![1.0, 0.0])],
            HashMap::new(),
            vec![question("Q1", "K1")],
            vec![],
        )
        .unwrap();
        assert!(matches!(
            catalog.embedding("K9"),
            Err(RecError::UnknownKp(_))
        ));
        assert!(matches!(
            catalog.question("Q9"),
            Err(RecError::UnknownQuestion(_))
        ));
    }

    #[test]
    fn test_question_with_unknown_kp_is_corrupt() {
        let err = Catalog::new(
            vec![kp("K1", vec![1.0, 0.0])],
            HashMap::new(),
            vec![question("Q1", "K9")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RecError::CorruptCatalog(_)));
    }

    #[test]
    fn test_mismatched_dimension_is_corrupt() {
        let err = Catalog::new(
            vec![kp("K1", vec![1.0, 0.0]), kp("K2", vec![1.0, 0.0, 0.0])],
            HashMap::new(),
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RecError::CorruptCatalog(_)));
    }

    #[test]
    fn test_answer_must_match_an_option() {
        let mut q = question("Q1", "K1");
        q.answer = "nope".to_string();
        let err = Catalog::new(
            vec![kp("K1", vec![1.0, 0.0])],
            HashMap::new(),
            vec![q],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RecError::CorruptCatalog(_)));
    }

    #[test]
    fn test_bank_order_and_inverted_index() {
        let catalog = Catalog::new(
            vec![kp("K1", vec![1.0, 0.0]), kp("K2", vec![0.0, 1.0])],
            HashMap::new(),
            vec![question("Q2", "K1"), question("Q1", "K1"), question("Q3", "K2")],
            vec![],
        )
        .unwrap();
        let order: Vec<&str> = catalog
            .questions_in_bank_order()
            .map(|q| q.qid.as_str())
            .collect();
        assert_eq!(order, vec!["Q2", "Q1", "Q3"]);
        let for_k1: Vec<&str> = catalog.questions_with("K1").map(|q| q.qid.as_str()).collect();
        assert_eq!(for_k1, vec!["Q2", "Q1"]);
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let catalog = Catalog::new(
            vec![kp("K1", vec![1.0, 0.0])],
            HashMap::from([("K1".to_string(), "Sets".to_string())]),
            vec![],
            vec![],
        )
        .unwrap();
        assert_eq!(catalog.name("K1"), "Sets");
        assert_eq!(catalog.name("K9"), "K9");
    }
}
