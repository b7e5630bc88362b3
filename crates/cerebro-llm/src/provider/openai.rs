//! OpenAI-compatible provider implementation
//!
//! Serves `openai` and every backend that speaks the chat completions
//! dialect (`deepseek`, `openrouter`, `groq`, `ollama`).

use async_trait::async_trait;
use cerebro_config::BrainConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Provider;
use crate::convert::openai::{build_request, error_from_body};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse};
use crate::resilience::{AbortSignal, Resilience};
use crate::types::{ChatRequest, ChatResult, GenerationSettings};

/// Default `OpenAI` API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    settings: GenerationSettings,
    resilience: Resilience,
}

impl OpenAiProvider {
    /// Create from the `[brain]` section
    ///
    /// `default_base_url` is used when the configuration does not set one.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the default base URL is invalid.
    pub fn new(name: impl Into<String>, config: &BrainConfig, default_base_url: &str) -> Result<Self, LlmError> {
        Ok(Self {
            name: name.into(),
            client: Client::new(),
            base_url: super::base_url(config.base_url.as_ref(), default_base_url)?,
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

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        super::endpoint(&self.base_url, "chat/completions")
    }

    async fn send(&self, wire: &OpenAiRequest, token: CancellationToken) -> Result<OpenAiResponse, LlmError> {
        let mut builder = self.client.post(self.completions_url()).json(wire);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        tracing::debug!(provider = %self.name, model = %wire.model, messages = wire.messages.len(), "sending chat request");
        super::send_json(&self.name, builder, &token, error_from_body).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: &ChatRequest, signal: Option<&AbortSignal>) -> Result<ChatResult, LlmError> {
        let wire = &build_request(request, &self.settings);
        let response = self.resilience.call(move |token| self.send(wire, token), signal).await?;

        let result = ChatResult::try_from(response)?;
        tracing::debug!(
            provider = %self.name,
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
