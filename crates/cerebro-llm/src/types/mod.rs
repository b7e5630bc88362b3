//! Internal canonical types for chat request/result representation
//!
//! These types are provider-agnostic and serve as the normalized internal
//! representation that all wire formats convert to and from. Their JSON
//! shape is the interchange contract with the agent loop.

pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{ContentBlock, Message, MessageContent, Role, ToolResultContent};
pub use request::{ChatRequest, GenerationSettings, SystemPrompt, TextBlock};
pub use response::{ChatResult, StopReason, ToolCall, Usage};
pub use tool::ToolSpec;
