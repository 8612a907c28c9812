use anyhow::Result;
use std::sync::Arc;

fn main() -> Result<()> {
    let config = kgrec::config::Config::load()?;
    kgrec::logging::init_logging(&config);

    let catalog = Arc::new(kgrec::catalog::loader::load_catalog(&config.data)?);
    let _engine = kgrec::engine::RecommendationEngine::new(catalog.clone(), config.engine);

    tracing::info!(
        kps = catalog.kp_count(),
        questions = catalog.question_count(),
        dim = catalog.dim(),
        "kgrec engine ready"
    );
    Ok(())
}
