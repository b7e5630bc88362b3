//! Provider trait and the HTTP plumbing shared by backend adapters

pub mod anthropic;
pub mod google;
pub mod openai;

use async_trait::async_trait;
use cerebro_config::BrainConfig;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::LlmError;
use crate::resilience::{AbortSignal, until_cancelled};
use crate::types::{ChatRequest, ChatResult, GenerationSettings, Message};

/// A configured LLM backend
///
/// Adapters hold only immutable state and are shared behind `Arc`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier used in logs
    fn name(&self) -> &str;

    /// Send one chat turn
    ///
    /// Runs under the adapter's resilience policy; aborting `signal` fails
    /// the call with the abort reason.
    async fn chat(&self, request: &ChatRequest, signal: Option<&AbortSignal>) -> Result<ChatResult, LlmError>;

    /// Check that the backend is reachable and the credentials are accepted
    ///
    /// Sends a minimal request with a single attempt.
    async fn ping(&self) -> Result<(), LlmError>;
}

/// Generation settings taken from the `[brain]` section
pub(crate) fn generation_settings(config: &BrainConfig) -> GenerationSettings {
    GenerationSettings {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

/// Configured base URL, or the backend default
pub(crate) fn base_url(configured: Option<&Url>, default: &str) -> Result<Url, LlmError> {
    match configured {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| LlmError::Config(format!("invalid default base URL {default}: {e}"))),
    }
}

/// Join a path onto a base URL, keeping the base path
pub(crate) fn endpoint(base_url: &Url, path: &str) -> String {
    let base = base_url.as_str().trim_end_matches('/');
    format!("{base}/{path}")
}

/// Request and settings used by `ping`
pub(crate) fn ping_request(settings: &GenerationSettings) -> (ChatRequest, GenerationSettings) {
    let request = ChatRequest::new("", vec![Message::user("ping")]);
    let settings = GenerationSettings {
        max_tokens: 1,
        ..settings.clone()
    };
    (request, settings)
}

/// Send a prepared request and decode a successful JSON body
///
/// The request is dropped as soon as `token` is cancelled. Non-2xx
/// responses are normalized through `error_from_body`.
pub(crate) async fn send_json<T>(
    provider: &str,
    builder: RequestBuilder,
    token: &CancellationToken,
    error_from_body: fn(u16, &str) -> LlmError,
) -> Result<T, LlmError>
where
    T: DeserializeOwned,
{
    until_cancelled(token, async {
        let response = builder.send().await.map_err(|e| {
            tracing::debug!(provider, error = %e, "upstream request failed");
            LlmError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider, status = %status, "upstream returned error");
            return Err(error_from_body(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    })
    .await
}
