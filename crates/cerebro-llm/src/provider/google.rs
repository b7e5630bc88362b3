//! Google Generative Language (Gemini) provider implementation

use async_trait::async_trait;
use cerebro_config::BrainConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Provider;
use crate::convert::google::{build_request, error_from_body};
use crate::error::LlmError;
use crate::protocol::google::{GoogleRequest, GoogleResponse};
use crate::resilience::{AbortSignal, Resilience};
use crate::types::{ChatRequest, ChatResult, GenerationSettings};

/// Default Google Generative Language API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    settings: GenerationSettings,
    resilience: Resilience,
}

impl GoogleProvider {
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

    /// Build the `generateContent` URL for the configured model
    fn generate_url(&self) -> String {
        super::endpoint(&self.base_url, &format!("models/{}:generateContent", self.settings.model))
    }

    async fn send(&self, wire: &GoogleRequest, token: CancellationToken) -> Result<GoogleResponse, LlmError> {
        let mut builder = self.client.post(self.generate_url()).json(wire);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key.expose_secret());
        }

        tracing::debug!(provider = "google", model = %self.settings.model, contents = wire.contents.len(), "sending chat request");
        super::send_json(self.name(), builder, &token, error_from_body).await
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn chat(&self, request: &ChatRequest, signal: Option<&AbortSignal>) -> Result<ChatResult, LlmError> {
        let wire = &build_request(request, &self.settings);
        let response = self.resilience.call(move |token| self.send(wire, token), signal).await?;

        let result = ChatResult::from(response);
        tracing::debug!(
            provider = "google",
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
