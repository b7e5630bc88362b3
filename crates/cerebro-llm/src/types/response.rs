use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::{ContentBlock, Message, MessageContent, Role};

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Model finished its turn
    EndTurn,
    /// Model wants one or more tools invoked
    ToolUse,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub input_tokens: u32,
    /// Tokens generated in the completion
    pub output_tokens: u32,
}

/// A tool invocation requested by the model
///
/// Field names match the `tool_use` content block, so the signature is
/// `thought_signature` in both places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, native or synthesized
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments
    pub input: Map<String, Value>,
    /// Opaque token to replay with this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl From<ToolCall> for ContentBlock {
    fn from(call: ToolCall) -> Self {
        Self::ToolUse {
            id: call.id,
            name: call.name,
            input: call.input,
            thought_signature: call.thought_signature,
        }
    }
}

/// Normalized result of one chat call
///
/// `stop_reason` is `ToolUse` exactly when `tool_calls` is non-empty, and
/// `raw_content` is the text (when non-empty) followed by one `ToolUse` block
/// per call. [`ChatResult::new`] is the only constructor, so both hold for
/// every value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResult {
    stop_reason: StopReason,
    text: String,
    tool_calls: Vec<ToolCall>,
    raw_content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
}

impl ChatResult {
    /// Assemble a result from extracted text and tool calls
    pub fn new(text: String, tool_calls: Vec<ToolCall>) -> Self {
        let stop_reason = if tool_calls.is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };

        let mut raw_content = Vec::with_capacity(tool_calls.len() + 1);
        if !text.is_empty() {
            raw_content.push(ContentBlock::text(text.clone()));
        }
        raw_content.extend(tool_calls.iter().cloned().map(ContentBlock::from));

        Self {
            stop_reason,
            text,
            tool_calls,
            raw_content,
            usage: None,
        }
    }

    /// Attach token usage reported by the backend
    #[must_use]
    pub const fn with_usage(mut self, usage: Option<Usage>) -> Self {
        self.usage = usage;
        self
    }

    /// Why the model stopped
    pub const fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Concatenated response text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Requested tool invocations, in response order
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// Canonical content blocks to append to the conversation
    pub fn raw_content(&self) -> &[ContentBlock] {
        &self.raw_content
    }

    /// Token usage, when reported
    pub const fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Assistant message to append to the next request
    pub fn to_message(&self) -> Message {
        Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(self.raw_content.clone()),
        }
    }
}
