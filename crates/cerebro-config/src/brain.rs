use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Provider that runs locally and needs no API key
pub const KEYLESS_PROVIDER: &str = "ollama";

/// Configuration of the LLM backend
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrainConfig {
    /// Provider identifier (`openai`, `anthropic`, `google`, ...)
    #[serde(default)]
    pub provider: String,
    /// Model identifier passed to the backend
    #[serde(default)]
    pub model: String,
    /// Maximum tokens to generate per turn
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Per-attempt timeout, in milliseconds or as a duration string
    #[serde(default = "default_timeout", deserialize_with = "deserialize_timeout")]
    pub timeout: Duration,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key: None,
            timeout: default_timeout(),
            base_url: None,
        }
    }
}

impl BrainConfig {
    /// Whether the configured provider requires an API key
    pub fn requires_api_key(&self) -> bool {
        !self.provider.eq_ignore_ascii_case(KEYLESS_PROVIDER)
    }
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeout {
    Millis(u64),
    Text(String),
}

fn deserialize_timeout<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimeout::deserialize(deserializer)? {
        RawTimeout::Millis(ms) => Ok(Duration::from_millis(ms)),
        RawTimeout::Text(s) => {
            duration_str::parse(&s).map_err(|e| serde::de::Error::custom(format!("invalid duration '{s}': {e}")))
        }
    }
}
