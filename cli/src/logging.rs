//! # Logging Setup
//!
//! One call, early in `main()`, wires up `tracing` for the whole run.
//! Demo narration goes to stdout; diagnostics go to stderr, filtered by
//! `RUST_LOG` when set (e.g. `RUST_LOG=prism_protocol=debug`).

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines for terminals.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (pretty|json)")),
        }
    }
}

/// Install the global subscriber. Panics if called twice.
///
/// `default_directives` applies when `RUST_LOG` is absent.
pub fn init(default_directives: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
