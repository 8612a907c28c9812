//! # kgrec
//!
//! Adaptive question recommender driven by a knowledge-graph embedding
//! space. For each learner it maintains a position vector in the shared KG
//! embedding space plus a per-knowledge-point mastery map, and selects the
//! next batch of multiple-choice questions by arithmetic over those
//! embeddings: a strategy selector picks between consolidation, gap-filling,
//! expansion and balanced modes, a candidate generator turns the chosen
//! strategy into target KPs and question pools, and a weighted ranker orders
//! the result with reproducible, seeded tie-breaking.
//!
//! The crate is embeddable: [`engine::RecommendationEngine`] is the whole
//! operation surface (create/recommend/submit/export/import); any HTTP or UI
//! layer lives outside. The catalog, embeddings and question bank are static
//! inputs loaded once at startup.
//!
//! ```rust,ignore
//! use kgrec::{catalog::loader::load_catalog, config::Config, engine::RecommendationEngine};
//!
//! let config = Config::load()?;
//! let catalog = std::sync::Arc::new(load_catalog(&config.data)?);
//! let engine = RecommendationEngine::new(catalog, config.engine);
//!
//! engine.create_learner("alice", None).await?;
//! let questions = engine.get_recommendations("alice", 3).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod grader;
pub mod learner;
pub mod logging;
pub mod recommend;
pub mod registry;
pub mod relations;
pub mod seed;
pub mod sim;
pub mod snapshot;
pub mod store;
pub mod vecmath;

pub use catalog::{Catalog, KgEdge, Question, RelationLabel};
pub use config::{Config, DataPaths, EngineConfig};
pub use engine::{
    BatchSummary, ImportReport, LearnerCreated, LearnerStatus, LearnerSummary,
    RecommendationEngine, WeakPointReport,
};
pub use errors::RecError;
pub use grader::{AnswerSubmission, GradedAnswer};
pub use learner::{LearnerState, ProgressSummary};
pub use recommend::{RecommendedQuestion, Strategy, StrategySource};
pub use relations::{RelationKind, RelationVectors};
pub use snapshot::{LearnerSnapshot, SNAPSHOT_VERSION};
pub use store::{jsonfile::JsonFileStore, SnapshotStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
