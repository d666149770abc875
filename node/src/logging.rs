//! # Structured Logging
//!
//! Initializes the `tracing` subscriber with either human-readable or
//! JSON output and `RUST_LOG`-style filtering. Logs go to stderr so
//! stdout stays clean for anything piped out of the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for terminals.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

/// Installs the global tracing subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset. Calling this twice
/// panics (by design — a second subscriber would silently eat logs).
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
    }
}
