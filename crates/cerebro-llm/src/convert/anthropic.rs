//! Conversion between canonical types and Anthropic Messages wire format

use serde_json::Value;

use super::{fallback_error, into_arguments};
use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicErrorResponse, AnthropicMessage, AnthropicRequest,
    AnthropicResponse, AnthropicResponseBlock, AnthropicSystem, AnthropicTextBlock, AnthropicTool,
};
use crate::types::{
    ChatRequest, ChatResult, ContentBlock, GenerationSettings, Message, MessageContent, Role, SystemPrompt, ToolCall,
    ToolSpec, Usage,
};

// -- Outbound: canonical request -> Anthropic wire request --

/// Build the wire request for a canonical chat request
///
/// The canonical shape already mirrors the Messages API, so blocks map one to
/// one. Thought signatures have no Anthropic counterpart and are dropped.
pub fn build_request(request: &ChatRequest, settings: &GenerationSettings) -> AnthropicRequest {
    let system = (!request.system.is_empty()).then(|| AnthropicSystem::from(&request.system));
    let tools = (!request.tools.is_empty()).then(|| request.tools.iter().map(AnthropicTool::from).collect());

    AnthropicRequest {
        model: settings.model.clone(),
        max_tokens: settings.max_tokens,
        system,
        messages: request.messages.iter().map(AnthropicMessage::from).collect(),
        temperature: Some(settings.temperature),
        tools,
    }
}

impl From<&SystemPrompt> for AnthropicSystem {
    fn from(system: &SystemPrompt) -> Self {
        match system {
            SystemPrompt::Text(text) => Self::Text(text.clone()),
            SystemPrompt::Blocks(blocks) => Self::Blocks(
                blocks
                    .iter()
                    .map(|b| AnthropicTextBlock {
                        block_type: "text".to_owned(),
                        text: b.text.clone(),
                    })
                    .collect(),
            ),
        }
    }
}

impl From<&Message> for AnthropicMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let content = match &msg.content {
            MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
            MessageContent::Blocks(blocks) => {
                AnthropicContent::Blocks(blocks.iter().map(AnthropicContentBlock::from).collect())
            }
        };

        Self {
            role: role.to_owned(),
            content,
        }
    }
}

impl From<&ContentBlock> for AnthropicContentBlock {
    fn from(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => Self::Text { text: text.clone() },
            ContentBlock::ToolUse { id, name, input, .. } => Self::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: Value::Object(input.clone()),
            },
            ContentBlock::ToolResult { tool_use_id, content } => Self::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: Some(content.to_text()),
                is_error: None,
            },
        }
    }
}

impl From<&ToolSpec> for AnthropicTool {
    fn from(tool: &ToolSpec) -> Self {
        Self {
            name: tool.name.clone(),
            description: (!tool.description.is_empty()).then(|| tool.description.clone()),
            input_schema: tool.input_schema.clone(),
        }
    }
}

// -- Inbound: Anthropic wire response -> canonical result --

impl From<AnthropicResponse> for ChatResult {
    fn from(resp: AnthropicResponse) -> Self {
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                AnthropicResponseBlock::Text { text } => texts.push(text),
                AnthropicResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    input: into_arguments(input),
                    thought_signature: None,
                }),
                AnthropicResponseBlock::Other => {}
            }
        }

        let usage = resp.usage.map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        });

        Self::new(texts.join("\n"), tool_calls).with_usage(usage)
    }
}

/// Normalize an Anthropic error body into an upstream error
pub fn error_from_body(status: u16, body: &str) -> LlmError {
    match serde_json::from_str::<AnthropicErrorResponse>(body) {
        Ok(parsed) => LlmError::upstream(Some(status), parsed.error.message),
        Err(_) => fallback_error(status, body),
    }
}
