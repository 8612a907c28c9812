/// Logging setup for the recommender binaries.
///
/// All output goes to stderr; stdout stays free for reports and snapshot
/// documents. The output shape is explicit configuration (`log_json`), not
/// terminal sniffing — recommendation runs are routinely captured by
/// grading scripts that need one predictable format either way.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global subscriber.
///
/// The level comes from `config.log_level`; a RUST_LOG env var overrides it
/// at runtime. `config.log_json` switches from human-readable lines to
/// newline-delimited JSON.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
