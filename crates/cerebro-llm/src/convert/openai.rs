//! Conversion between canonical types and `OpenAI` chat completion wire format

use serde_json::{Map, Value};

use super::fallback_error;
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiErrorResponse, OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiTool, OpenAiToolCall,
};
use crate::types::{
    ChatRequest, ChatResult, ContentBlock, GenerationSettings, MessageContent, Role, ToolCall, ToolSpec, Usage,
};

/// Reasoning models that reject system messages and sampling temperature
///
/// Dated snapshots (`o1-2024-12-17`) and router prefixes (`openai/o3-mini`)
/// resolve to these base names.
const REASONING_MODELS: &[&str] = &["o1", "o1-mini", "o1-preview", "o3", "o3-mini", "o4-mini"];

/// Whether `model` is a reasoning model variant
pub fn is_reasoning_model(model: &str) -> bool {
    let model = model.rsplit('/').next().unwrap_or(model);
    REASONING_MODELS.iter().any(|base| {
        model == *base
            || model
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('-'))
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
    })
}

// -- Outbound: canonical request -> OpenAI wire request --

/// Build the wire request for a canonical chat request
///
/// For reasoning models the system prompt is folded into the first user
/// message, `temperature` is omitted and the token limit is sent as
/// `max_completion_tokens`.
pub fn build_request(request: &ChatRequest, settings: &GenerationSettings) -> OpenAiRequest {
    let reasoning = is_reasoning_model(&settings.model);
    let mut messages = Vec::new();
    let mut preamble = None;

    if !request.system.is_empty() {
        let system = request.system.joined_text();
        if reasoning {
            preamble = Some(system);
        } else {
            messages.push(OpenAiMessage::text("system", system));
        }
    }

    for msg in &request.messages {
        match msg.role {
            Role::User => push_user_message(&mut messages, &msg.content, preamble.take()),
            Role::Assistant => messages.push(assistant_message(&msg.content)),
        }
    }

    // No user turn to fold into; send the prompt as the opening user turn
    if let Some(system) = preamble {
        messages.insert(0, OpenAiMessage::text("user", system));
    }

    let tools = (!request.tools.is_empty()).then(|| request.tools.iter().map(OpenAiTool::from).collect());

    OpenAiRequest {
        model: settings.model.clone(),
        messages,
        temperature: (!reasoning).then_some(settings.temperature),
        max_tokens: (!reasoning).then_some(settings.max_tokens),
        max_completion_tokens: reasoning.then_some(settings.max_tokens),
        tools,
    }
}

/// Append a user turn, splitting tool results into `tool` messages
fn push_user_message(out: &mut Vec<OpenAiMessage>, content: &MessageContent, preamble: Option<String>) {
    let mut texts: Vec<String> = preamble.into_iter().collect();

    match content {
        MessageContent::Text(text) => texts.push(text.clone()),
        MessageContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => texts.push(text.clone()),
                    ContentBlock::ToolResult { tool_use_id, content } => out.push(OpenAiMessage {
                        role: "tool".to_owned(),
                        content: Some(content.to_text()),
                        tool_calls: None,
                        tool_call_id: Some(tool_use_id.clone()),
                    }),
                    ContentBlock::ToolUse { id, .. } => {
                        tracing::debug!(tool_use_id = %id, "dropping tool use block from user message");
                    }
                }
            }
        }
    }

    if !texts.is_empty() {
        out.push(OpenAiMessage::text("user", texts.join("\n\n")));
    }
}

/// Convert an assistant turn, moving tool uses into `tool_calls`
fn assistant_message(content: &MessageContent) -> OpenAiMessage {
    let mut tool_calls = Vec::new();

    if let MessageContent::Blocks(blocks) = content {
        for block in blocks {
            match block {
                ContentBlock::ToolUse { id, name, input, .. } => tool_calls.push(OpenAiToolCall {
                    id: id.clone(),
                    tool_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: name.clone(),
                        arguments: Value::Object(input.clone()).to_string(),
                    },
                }),
                ContentBlock::Text { .. } => {}
                ContentBlock::ToolResult { tool_use_id, .. } => {
                    tracing::debug!(%tool_use_id, "dropping tool result block from assistant message");
                }
            }
        }
    }

    let text = content.joined_text();
    let content = if text.is_empty() && !tool_calls.is_empty() {
        None
    } else {
        Some(text)
    };

    OpenAiMessage {
        role: "assistant".to_owned(),
        content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        tool_call_id: None,
    }
}

impl From<&ToolSpec> for OpenAiTool {
    fn from(tool: &ToolSpec) -> Self {
        Self {
            tool_type: "function".to_owned(),
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: (!tool.description.is_empty()).then(|| tool.description.clone()),
                parameters: Some(tool.input_schema.clone()),
            },
        }
    }
}

// -- Inbound: OpenAI wire response -> canonical result --

impl TryFrom<OpenAiResponse> for ChatResult {
    type Error = LlmError;

    fn try_from(resp: OpenAiResponse) -> Result<Self, Self::Error> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("response contained no choices".to_owned()))?;

        let text = choice.message.content.unwrap_or_default();
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(ToolCall::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let usage = resp.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(Self::new(text, tool_calls).with_usage(usage))
    }
}

impl TryFrom<OpenAiToolCall> for ToolCall {
    type Error = LlmError;

    fn try_from(call: OpenAiToolCall) -> Result<Self, Self::Error> {
        let OpenAiFunctionCall { name, arguments } = call.function;

        let input = if arguments.trim().is_empty() {
            Map::new()
        } else {
            serde_json::from_str(&arguments).map_err(|e| {
                LlmError::MalformedResponse(format!("invalid arguments for tool call `{name}`: {e}"))
            })?
        };

        Ok(Self {
            id: call.id,
            name,
            input,
            thought_signature: None,
        })
    }
}

/// Normalize an `OpenAI` error body into an upstream error
pub fn error_from_body(status: u16, body: &str) -> LlmError {
    match serde_json::from_str::<OpenAiErrorResponse>(body) {
        Ok(parsed) => LlmError::upstream(Some(status), parsed.error.message),
        Err(_) => fallback_error(status, body),
    }
}
