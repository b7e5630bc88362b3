use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::ToolSpec;

/// System prompt, either a single string or ordered text blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    /// Plain text prompt
    Text(String),
    /// Ordered text blocks
    Blocks(Vec<TextBlock>),
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl SystemPrompt {
    /// Whether the prompt carries no text at all
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Blocks(blocks) => blocks.iter().all(|b| b.text.is_empty()),
        }
    }

    /// Prompt text with blocks joined by newlines
    pub fn joined_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for SystemPrompt {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for SystemPrompt {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Text block within a system prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Block type, always "text"
    #[serde(rename = "type", default = "text_block_type")]
    pub block_type: String,
    /// The text string
    pub text: String,
}

impl TextBlock {
    /// Build a text block
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            block_type: text_block_type(),
            text: text.into(),
        }
    }
}

fn text_block_type() -> String {
    "text".to_owned()
}

/// Internal canonical chat request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System prompt
    #[serde(default)]
    pub system: SystemPrompt,
    /// Conversation messages in turn order
    pub messages: Vec<Message>,
    /// Tools available to the model
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    /// Create a request from a system prompt and messages, without tools
    pub fn new(system: impl Into<SystemPrompt>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            tools: Vec::new(),
        }
    }

    /// Attach tool definitions
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// Per-adapter generation parameters taken from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}
