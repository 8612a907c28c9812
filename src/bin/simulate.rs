/// Simulation CLI: drives synthetic learners through the recommendation
/// loop and reports mastery trajectories and strategy usage.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use kgrec::catalog::loader::load_catalog;
use kgrec::config::{DataPaths, EngineConfig};
use kgrec::engine::RecommendationEngine;
use kgrec::sim::runner::run_simulation;
use kgrec::sim::{report, SimConfig};

#[derive(Parser)]
#[command(name = "kgrec-simulate", about = "Simulated-learner run for kgrec")]
struct Cli {
    /// Embeddings table (kp_id + D float columns)
    #[arg(long, default_value = "data/embeddings.csv")]
    embeddings: String,

    /// KG edge table
    #[arg(long, default_value = "data/knowledge_graph.csv")]
    knowledge_graph: String,

    /// Question bank JSON
    #[arg(long, default_value = "data/question_bank.json")]
    question_bank: String,

    /// KP display-name table
    #[arg(long, default_value = "data/kp_names.csv")]
    kp_names: String,

    /// Number of synthetic learners
    #[arg(long, default_value_t = 4)]
    learners: usize,

    /// Batches per learner
    #[arg(long, default_value_t = 6)]
    batches: usize,

    /// Questions requested per batch
    #[arg(long, default_value_t = 3)]
    per_batch: usize,

    /// Run seed (answers, nonces)
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Optional path for the JSON report
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = DataPaths {
        embeddings: cli.embeddings,
        knowledge_graph: cli.knowledge_graph,
        question_bank: cli.question_bank,
        kp_names: cli.kp_names,
    };
    let catalog = Arc::new(load_catalog(&paths)?);
    let engine = RecommendationEngine::new(catalog, EngineConfig::default());

    let config = SimConfig {
        learners: cli.learners,
        batches: cli.batches,
        questions_per_batch: cli.per_batch,
        seed: cli.seed,
    };

    let sim_report = run_simulation(&engine, &config).await?;
    report::print_report(&sim_report);

    if let Some(path) = cli.output {
        report::save_report(&sim_report, &path)?;
        tracing::info!(path = %path.display(), "Report saved");
    }

    Ok(())
}
