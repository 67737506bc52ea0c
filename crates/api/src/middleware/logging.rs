//! Logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is not set: the configured level for our own
/// crates, quieter defaults for chatty dependencies.
fn default_filter(level: &str) -> String {
    format!(
        "{level},podcast_club_api={level},domain={level},persistence={level},sqlx=warn,tower_http=info"
    )
}

/// Installs the global subscriber. `json` gives one JSON object per line,
/// anything else the human readable pretty format.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
        _ => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
    };

    if let Err(err) = result {
        eprintln!("Logging already initialized: {}", err);
    }
}
