//! LLM provider abstraction for Cerebro
//!
//! One canonical chat representation, converters to and from the `OpenAI`,
//! Anthropic and Google wire formats, and a resilience wrapper (timeout,
//! cancellation, jittered retry) shared by every provider adapter.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod classify;
pub mod convert;
pub mod error;
pub mod factory;
pub mod protocol;
pub mod provider;
pub mod resilience;
pub mod types;

pub use error::LlmError;
pub use factory::{KNOWN_PROVIDERS, create_provider, create_provider_with};
pub use provider::Provider;
pub use resilience::{AbortSignal, Resilience};
pub use types::{
    ChatRequest, ChatResult, ContentBlock, Message, MessageContent, Role, StopReason, SystemPrompt, ToolCall,
    ToolSpec,
};
