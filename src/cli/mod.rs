//! Command line front-ends
//!
//! - [`server`]: long-running HTTP server mode
//! - [`oneshot`]: single resolutions printed as JSON

pub mod oneshot;
pub mod server;

use crate::config::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// configured level; `verbose` forces debug. Logs go to stderr so one-shot
/// JSON on stdout stays parseable.
pub fn init_logging(settings: &LoggingSettings) {
    let level = if settings.verbose {
        "debug"
    } else {
        settings.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
