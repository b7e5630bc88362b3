//! Conversion between canonical types and Google Generative Language wire format

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use super::{fallback_error, into_arguments};
use crate::error::LlmError;
use crate::protocol::google::{
    GoogleContent, GoogleErrorResponse, GoogleFunctionCall, GoogleFunctionDeclaration, GoogleFunctionResponse,
    GoogleGenerationConfig, GooglePart, GooglePartData, GoogleRequest, GoogleResponse, GoogleTool,
};
use crate::types::{
    ChatRequest, ChatResult, ContentBlock, GenerationSettings, Role, SystemPrompt, ToolCall, ToolResultContent, Usage,
};

// -- Outbound: canonical request -> Google wire request --

/// Build the wire request for a canonical chat request
///
/// Function responses are matched to their calls by name, so every tool
/// result is named after the tool use with the same id in an earlier
/// assistant turn.
pub fn build_request(request: &ChatRequest, settings: &GenerationSettings) -> GoogleRequest {
    let mut tool_names: HashMap<String, String> = HashMap::new();
    let mut contents = Vec::with_capacity(request.messages.len());

    for msg in &request.messages {
        let blocks = msg.content.to_blocks();
        let mut parts = Vec::with_capacity(blocks.len());

        for block in &blocks {
            match block {
                ContentBlock::Text { text } => parts.push(GooglePart::new(GooglePartData::Text(text.clone()))),
                ContentBlock::ToolUse {
                    id,
                    name,
                    input,
                    thought_signature,
                } => {
                    if msg.role == Role::Assistant {
                        tool_names.insert(id.clone(), name.clone());
                    }
                    parts.push(GooglePart {
                        thought_signature: thought_signature.clone(),
                        ..GooglePart::new(GooglePartData::FunctionCall(GoogleFunctionCall {
                            name: name.clone(),
                            args: Value::Object(input.clone()),
                        }))
                    });
                }
                ContentBlock::ToolResult { tool_use_id, content } => {
                    let name = tool_names.get(tool_use_id).cloned().unwrap_or_else(|| {
                        tracing::warn!(%tool_use_id, "no prior tool use for result, using id as function name");
                        tool_use_id.clone()
                    });
                    parts.push(GooglePart::new(GooglePartData::FunctionResponse(GoogleFunctionResponse {
                        name,
                        response: function_response(content),
                    })));
                }
            }
        }

        if parts.is_empty() {
            tracing::debug!("skipping message without content");
            continue;
        }

        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(GoogleContent {
            role: Some(role.to_owned()),
            parts,
        });
    }

    let tools = (!request.tools.is_empty()).then(|| {
        vec![GoogleTool {
            function_declarations: request
                .tools
                .iter()
                .map(|tool| GoogleFunctionDeclaration {
                    name: tool.name.clone(),
                    description: (!tool.description.is_empty()).then(|| tool.description.clone()),
                    parameters: Some(tool.input_schema.clone()),
                })
                .collect(),
        }]
    });

    GoogleRequest {
        contents,
        system_instruction: system_instruction(&request.system),
        generation_config: Some(GoogleGenerationConfig {
            temperature: Some(settings.temperature),
            max_output_tokens: Some(settings.max_tokens),
        }),
        tools,
    }
}

fn system_instruction(system: &SystemPrompt) -> Option<GoogleContent> {
    if system.is_empty() {
        return None;
    }

    let parts = match system {
        SystemPrompt::Text(text) => vec![GooglePart::new(GooglePartData::Text(text.clone()))],
        SystemPrompt::Blocks(blocks) => blocks
            .iter()
            .filter(|b| !b.text.is_empty())
            .map(|b| GooglePart::new(GooglePartData::Text(b.text.clone())))
            .collect(),
    };

    Some(GoogleContent { role: None, parts })
}

/// Function response payload; Google expects an object
fn function_response(content: &ToolResultContent) -> Value {
    match content {
        ToolResultContent::Text(text) => json!({ "result": text }),
        ToolResultContent::Json(map) => Value::Object(map.clone()),
    }
}

// -- Inbound: Google wire response -> canonical result --

impl From<GoogleResponse> for ChatResult {
    fn from(resp: GoogleResponse) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis());
        into_result(resp, now)
    }
}

/// Convert a response, synthesizing call ids from `timestamp_ms`
///
/// Google function calls carry no id, so each gets
/// `call_<timestamp_ms>_<position>` with `position` counting calls in the
/// response.
pub fn into_result(resp: GoogleResponse, timestamp_ms: u128) -> ChatResult {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    let parts = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    for part in parts {
        if part.thought == Some(true) {
            continue;
        }
        match part.data {
            Some(GooglePartData::Text(text)) => texts.push(text),
            Some(GooglePartData::FunctionCall(call)) => tool_calls.push(ToolCall {
                id: format!("call_{timestamp_ms}_{}", tool_calls.len()),
                name: call.name,
                input: into_arguments(call.args),
                thought_signature: part.thought_signature,
            }),
            _ => {}
        }
    }

    let usage = resp.usage_metadata.map(|u| Usage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });

    ChatResult::new(texts.join("\n"), tool_calls).with_usage(usage)
}

/// Normalize a Google error body into an upstream error
pub fn error_from_body(status: u16, body: &str) -> LlmError {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(parsed) => LlmError::upstream(Some(status), parsed.error.message),
        Err(_) => fallback_error(status, body),
    }
}
