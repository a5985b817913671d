use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,riverstone=info";

/// Install the global subscriber. Logs go to stderr; stdout carries replies.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
