use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "NEWSDESK_EDITOR_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global `fmt` subscriber. Calling it again is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
