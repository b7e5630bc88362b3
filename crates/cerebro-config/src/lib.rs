#![allow(clippy::must_use_candidate)]

pub mod brain;
mod env;
mod loader;
pub mod telemetry;

use serde::Deserialize;

pub use brain::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Cerebro configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// LLM backend used for chat turns
    #[serde(default)]
    pub brain: BrainConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
