//! Anthropic Messages API provider implementation

use async_trait::async_trait;
use cerebro_config::BrainConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Provider;
use crate::convert::anthropic::{build_request, error_from_body};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::resilience::{AbortSignal, Resilience};
use crate::types::{ChatRequest, ChatResult, GenerationSettings};

/// Default Anthropic API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider
pub struct AnthropicProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    settings: GenerationSettings,
    resilience: Resilience,
}

impl AnthropicProvider {
    /// Create from the `[brain]` section
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the default base URL is invalid.
    pub fn new(config: &BrainConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::new(),
            base_url: super::base_url(config.base_url.as_ref(), DEFAULT_BASE_URL)?,
            api_key: config.api_key.clone(),
            settings: super::generation_settings(config),
            resilience: Resilience::new(config.timeout),
        })
    }

    /// Replace the retry and timeout policy
    #[must_use]
    pub const fn with_resilience(mut self, resilience: Resilience) -> Self {
        self.resilience = resilience;
        self
    }

    fn messages_url(&self) -> String {
        super::endpoint(&self.base_url, "messages")
    }

    async fn send(&self, wire: &AnthropicRequest, token: CancellationToken) -> Result<AnthropicResponse, LlmError> {
        let mut builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(wire);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        tracing::debug!(provider = "anthropic", model = %wire.model, messages = wire.messages.len(), "sending chat request");
        super::send_json(self.name(), builder, &token, error_from_body).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn chat(&self, request: &ChatRequest, signal: Option<&AbortSignal>) -> Result<ChatResult, LlmError> {
        let wire = &build_request(request, &self.settings);
        let response = self.resilience.call(move |token| self.send(wire, token), signal).await?;

        let result = ChatResult::from(response);
        tracing::debug!(
            provider = "anthropic",
            model = %self.settings.model,
            stop_reason = ?result.stop_reason(),
            tool_calls = result.tool_calls().len(),
            "received chat response"
        );
        Ok(result)
    }

    async fn ping(&self) -> Result<(), LlmError> {
        let (request, settings) = super::ping_request(&self.settings);
        let wire = &build_request(&request, &settings);

        self.resilience
            .with_max_attempts(1)
            .call(move |token| self.send(wire, token), None)
            .await?;
        Ok(())
    }
}
