use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "chatter_sentiment=info,warn";

/// Install the global subscriber: compact lines, or JSON when `CHATTER_LOG_JSON=1`.
///
/// Safe to call more than once; a subscriber that is already installed
/// (e.g. by the Shuttle runtime) wins.
pub fn init_tracing() {
    let json = std::env::var("CHATTER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().compact()))
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
