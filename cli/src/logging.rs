//! Logging for the `ignition` binary.
//!
//! Events go to stderr. Stdout is reserved for manifests and command output
//! so they can be piped into a signer or `jq`. `RUST_LOG` overrides the
//! level chosen from the `-v` count.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, one event per line.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Filter directives for a `-v` count. Other crates stay at `warn` until
/// the count reaches two.
pub fn default_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,ignition=info,ignition_client=info",
        1 => "warn,ignition=debug,ignition_client=debug",
        _ => "info,ignition=trace,ignition_client=trace",
    }
}

/// Installs the global subscriber. Call once, before the first event.
pub fn init_logging(verbosity: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(layer.with_line_number(true)).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }

    tracing::debug!(?format, verbosity, "logging initialized");
}
