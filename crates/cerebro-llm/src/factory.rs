//! Provider construction from configuration

use std::sync::Arc;

use cerebro_config::BrainConfig;

use crate::error::LlmError;
use crate::provider::Provider;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::google::GoogleProvider;
use crate::provider::openai::{self, OpenAiProvider};
use crate::resilience::Resilience;

/// Backends speaking the chat completions dialect, with their default base URLs
const OPENAI_COMPATIBLE: &[(&str, &str)] = &[
    ("openai", openai::DEFAULT_BASE_URL),
    ("deepseek", "https://api.deepseek.com/v1"),
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("groq", "https://api.groq.com/openai/v1"),
    ("ollama", "http://localhost:11434/v1"),
];

/// Every provider identifier accepted in `brain.provider`
pub const KNOWN_PROVIDERS: &[&str] = &[
    "openai",
    "deepseek",
    "openrouter",
    "groq",
    "ollama",
    "anthropic",
    "google",
    "gemini",
];

/// Create the provider named by `brain.provider`
///
/// Attempts use `brain.timeout` with the default retry schedule.
///
/// # Errors
///
/// Returns `LlmError::Config` for an unknown provider identifier.
pub fn create_provider(config: &BrainConfig) -> Result<Arc<dyn Provider>, LlmError> {
    create_provider_with(config, Resilience::new(config.timeout))
}

/// Create the provider named by `brain.provider` with an explicit policy
///
/// # Errors
///
/// Returns `LlmError::Config` for an unknown provider identifier.
pub fn create_provider_with(config: &BrainConfig, resilience: Resilience) -> Result<Arc<dyn Provider>, LlmError> {
    let id = config.provider.trim().to_ascii_lowercase();

    let provider: Arc<dyn Provider> = match id.as_str() {
        "anthropic" => Arc::new(AnthropicProvider::new(config)?.with_resilience(resilience)),
        "google" | "gemini" => Arc::new(GoogleProvider::new(config)?.with_resilience(resilience)),
        other => {
            let Some((name, default_base_url)) = OPENAI_COMPATIBLE.iter().find(|(name, _)| *name == other) else {
                return Err(LlmError::Config(format!(
                    "unknown provider '{}', expected one of: {}",
                    config.provider,
                    KNOWN_PROVIDERS.join(", ")
                )));
            };
            Arc::new(OpenAiProvider::new(*name, config, default_base_url)?.with_resilience(resilience))
        }
    };

    tracing::info!(
        provider = provider.name(),
        model = %config.model,
        timeout_ms = u64::try_from(resilience.timeout().as_millis()).unwrap_or(u64::MAX),
        "llm provider ready"
    );
    Ok(provider)
}
