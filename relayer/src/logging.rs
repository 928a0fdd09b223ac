//! # Structured Logging
//!
//! Installs the `tracing` subscriber: `RUST_LOG`-style filtering, pretty or
//! JSON output, always on stderr. Stdout belongs to command output such as
//! `simulate`'s final report.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "crossmint_relayer=info,crossmint_contracts=info,crossmint_protocol=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// "json" (any case) selects JSON; anything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Build the filter: `RUST_LOG` wins, then `level`, then [`DEFAULT_FILTER`].
pub fn build_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_FILTER)))
}

/// Install the global subscriber. Call once, early in `main()`.
///
/// Returns an error instead of panicking if a subscriber is already set.
pub fn init_logging(level: Option<&str>, format: LogFormat) -> anyhow::Result<()> {
    let filter = build_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
