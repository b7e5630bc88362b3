//! Logging setup for Cerebro
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a `fmt`
//! layer writing text or JSON lines to stderr.

use cerebro_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Directive used when neither the caller nor the config sets one
const DEFAULT_FILTER: &str = "info";

/// Initialize logging from configuration
///
/// `log_filter` (from the command line or `RUST_LOG`) takes precedence over
/// the configured filter. An invalid directive falls back to `info`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>, log_filter: Option<&str>) -> anyhow::Result<()> {
    let directive = resolve_filter(config, log_filter);
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let format = config.map(|c| c.format).unwrap_or_default();
    let fmt_layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Pick the filter directive: explicit override, then config, then `info`
fn resolve_filter<'a>(config: Option<&'a TelemetryConfig>, log_filter: Option<&'a str>) -> &'a str {
    log_filter
        .filter(|f| !f.trim().is_empty())
        .or_else(|| config.map(|c| c.filter.as_str()))
        .unwrap_or(DEFAULT_FILTER)
}
