use std::path::Path;

use anyhow::{Context, bail};
use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is invalid or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let expanded = crate::env::expand_env(&raw).context("config variable expansion failed")?;

        let config: Self = toml::from_str(&expanded).context("failed to parse config")?;
        config.validate()?;

        tracing::debug!(path = %path.display(), provider = %config.brain.provider, "configuration loaded");
        Ok(config)
    }

    /// Validate that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid `[brain]` setting
    pub fn validate(&self) -> anyhow::Result<()> {
        let brain = &self.brain;

        if brain.provider.trim().is_empty() {
            bail!("brain.provider must be set");
        }
        if brain.model.trim().is_empty() {
            bail!("brain.model must be set");
        }
        if brain.max_tokens == 0 {
            bail!("brain.max_tokens must be greater than 0");
        }
        if !(0.0..=2.0).contains(&brain.temperature) {
            bail!("brain.temperature must be between 0.0 and 2.0, got {}", brain.temperature);
        }
        if brain.timeout.is_zero() {
            bail!("brain.timeout must be greater than 0");
        }

        let has_key = brain
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty());
        if brain.requires_api_key() && !has_key {
            bail!("brain.api_key is required for provider '{}'", brain.provider);
        }

        Ok(())
    }
}
