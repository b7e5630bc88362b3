//! Conversion between canonical chat types and backend wire formats
//!
//! Each submodule builds the backend request from a [`ChatRequest`](crate::types::ChatRequest),
//! turns the backend response into a [`ChatResult`](crate::types::ChatResult)
//! and normalizes the backend's error body into an [`LlmError`].

pub mod anthropic;
pub mod google;
pub mod openai;

use serde_json::{Map, Value};

use crate::error::LlmError;

/// Upstream error for a body that did not match the backend's error shape
///
/// The raw body is kept as the message so the classifier can still find an
/// embedded code in it.
pub(crate) fn fallback_error(status: u16, body: &str) -> LlmError {
    let body = body.trim();
    let message = if body.is_empty() {
        format!("provider returned status {status}")
    } else {
        body.to_owned()
    };
    LlmError::upstream(Some(status), message)
}

/// Tool arguments as an object, wrapping anything else under `value`
pub(crate) fn into_arguments(args: Value) -> Map<String, Value> {
    match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => Map::from_iter([("value".to_owned(), other)]),
    }
}
