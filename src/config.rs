/// Configuration management using figment
///
/// Loads configuration with this precedence (highest wins):
/// 1. Defaults (hardcoded, matching the published algorithm constants)
/// 2. TOML file: kgrec.toml (in working directory)
/// 3. Environment variables: prefixed KGREC_ (e.g., KGREC_LOG_LEVEL=debug)

use figment::{
    Figment,
    providers::{Env, Format, Toml, Serialized},
};
use serde::{Deserialize, Serialize};
use crate::errors::RecError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit newline-delimited JSON logs instead of human-readable lines
    #[serde(default)]
    pub log_json: bool,

    /// Startup data file locations
    #[serde(default)]
    pub data: DataPaths,

    /// Recommendation engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Paths to the four catalog inputs loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// CSV: kp_id column followed by D embedding columns
    #[serde(default = "default_embeddings_path")]
    pub embeddings: String,

    /// CSV: source_name, source_id, relation, target_name, target_id
    #[serde(default = "default_edges_path")]
    pub knowledge_graph: String,

    /// JSON: { "questions": [{qid, content, options, answer, knowledge_points, difficulty}] }
    #[serde(default = "default_question_bank_path")]
    pub question_bank: String,

    /// CSV: kp_id, name
    #[serde(default = "default_kp_names_path")]
    pub kp_names: String,
}

/// Engine tuning knobs. Defaults are the reference constants; tests rely on
/// them, so override with care.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// EMA blend factor for the learner vector (old * alpha + batch * (1 - alpha))
    #[serde(default = "default_blend_alpha")]
    pub blend_alpha: f64,

    /// Mastery gain per unit weight on a correct answer
    #[serde(default = "default_correct_delta")]
    pub correct_delta: f64,

    /// Mastery gain per unit weight on a wrong answer
    #[serde(default = "default_wrong_delta")]
    pub wrong_delta: f64,

    /// Batch-vector contribution factor for wrong answers (correct answers contribute 1.0)
    #[serde(default = "default_wrong_strength")]
    pub wrong_strength: f64,

    /// Mastery score at or above which a KP counts as mastered
    #[serde(default = "default_mastered_threshold")]
    pub mastered_threshold: f64,

    /// Mastery score below which a KP counts as weak
    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f64,

    /// Mastery floor for leaving the cold-start path
    #[serde(default = "default_cold_start_threshold")]
    pub cold_start_threshold: f64,

    /// Number of trailing answers used for recent accuracy
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// KPs served by the cold-start path
    #[serde(default = "default_introductory_kps")]
    pub introductory_kps: Vec<String>,

    /// Seed for the simulated relation vectors
    #[serde(default = "default_relation_seed")]
    pub relation_seed: u64,

    /// System seed mixed with the learner id hash for cold vector fallback
    #[serde(default = "default_learner_seed")]
    pub learner_seed: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_embeddings_path() -> String {
    "data/embeddings.csv".to_string()
}

fn default_edges_path() -> String {
    "data/knowledge_graph.csv".to_string()
}

fn default_question_bank_path() -> String {
    "data/question_bank.json".to_string()
}

fn default_kp_names_path() -> String {
    "data/kp_names.csv".to_string()
}

fn default_blend_alpha() -> f64 {
    0.7
}

fn default_correct_delta() -> f64 {
    0.3
}

fn default_wrong_delta() -> f64 {
    0.1
}

fn default_wrong_strength() -> f64 {
    0.3
}

fn default_mastered_threshold() -> f64 {
    0.5
}

fn default_weak_threshold() -> f64 {
    0.3
}

fn default_cold_start_threshold() -> f64 {
    0.1
}

fn default_recent_window() -> usize {
    5
}

fn default_introductory_kps() -> Vec<String> {
    vec!["K1".to_string(), "K2".to_string(), "K3".to_string()]
}

fn default_relation_seed() -> u64 {
    42
}

fn default_learner_seed() -> u64 {
    7919
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            embeddings: default_embeddings_path(),
            knowledge_graph: default_edges_path(),
            question_bank: default_question_bank_path(),
            kp_names: default_kp_names_path(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            blend_alpha: default_blend_alpha(),
            correct_delta: default_correct_delta(),
            wrong_delta: default_wrong_delta(),
            wrong_strength: default_wrong_strength(),
            mastered_threshold: default_mastered_threshold(),
            weak_threshold: default_weak_threshold(),
            cold_start_threshold: default_cold_start_threshold(),
            recent_window: default_recent_window(),
            introductory_kps: default_introductory_kps(),
            relation_seed: default_relation_seed(),
            learner_seed: default_learner_seed(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_log_level(),
            log_json: false,
            data: DataPaths::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, TOML file, and environment variables.
    ///
    /// Environment variables override TOML file values. Nested keys use
    /// double underscores, e.g. KGREC_ENGINE__RELATION_SEED=7.
    pub fn load() -> Result<Config, RecError> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("kgrec.toml"))
            .merge(Env::prefixed("KGREC_").split("__"))
            .extract()
            .map_err(|e| RecError::Config(format!("Failed to load config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.engine.blend_alpha, 0.7);
        assert_eq!(config.engine.correct_delta, 0.3);
        assert_eq!(config.engine.wrong_delta, 0.1);
        assert_eq!(config.engine.recent_window, 5);
        assert_eq!(config.engine.introductory_kps, vec!["K1", "K2", "K3"]);
        assert_eq!(config.engine.relation_seed, 42);
    }
}
