//! Tracing initialization for host shells embedding the client.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::config::logging::LoggingConfig;

/// Initialize the global tracing subscriber from config.
///
/// `RUST_LOG` takes precedence over the configured level. Call once at
/// startup; a second call panics, so embedders that install their own
/// subscriber should skip this.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
