//! Tracing subscriber setup for the `tutor` binary.
//!
//! Logs always go to stderr. Stdout carries tool output and JSON-RPC frames.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "TUTOR_LOG";

/// Build the filter: `TUTOR_LOG` when set and valid, the configured level otherwise.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber.
///
/// Does nothing if a subscriber is already installed.
pub fn init(config: &LogConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Warning: logging already initialised: {}", e);
    }
}
