//! Provider construction helpers for integration tests

use std::sync::Arc;
use std::time::Duration;

use cerebro_config::BrainConfig;
use cerebro_llm::{Provider, Resilience, create_provider_with};
use secrecy::SecretString;

/// `[brain]` section pointing `provider` at a mock backend
pub fn brain(provider: &str, model: &str, base_url: &str) -> BrainConfig {
    BrainConfig {
        provider: provider.to_owned(),
        model: model.to_owned(),
        max_tokens: 256,
        temperature: 0.5,
        api_key: Some(SecretString::from("test-key")),
        timeout: Duration::from_secs(5),
        base_url: Some(base_url.parse().expect("valid URL")),
    }
}

/// Default schedule with millisecond backoff so retries do not slow tests down
pub fn fast_retries(timeout: Duration) -> Resilience {
    Resilience::new(timeout).with_backoff(Duration::from_millis(1), Duration::from_millis(5))
}

/// Build a provider with fast retries and a five second attempt timeout
pub fn provider(config: &BrainConfig) -> Arc<dyn Provider> {
    create_provider_with(config, fast_retries(Duration::from_secs(5))).expect("known provider")
}
