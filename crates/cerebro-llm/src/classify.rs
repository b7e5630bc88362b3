//! Transient-error classification for retry decisions

use serde_json::Value;

use crate::error::LlmError;

/// Message fragments that indicate a transport-level failure
///
/// Matched case-insensitively against the full error message.
const NETWORK_FAILURES: &[&str] = &[
    "connection reset",
    "connection refused",
    "connection aborted",
    "connection closed",
    "broken pipe",
    "host unreachable",
    "no route to host",
    "hang up",
    "dns error",
    "failed to lookup address",
    "error sending request",
    "timeout",
    "timed out",
    "socket disconnected",
    "unexpected eof",
];

/// Status returned when a backend rate-limits the caller
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Whether an error is transient and the call should be retried
///
/// Configuration errors, caller cancellations and malformed responses are
/// permanent regardless of their message.
pub fn is_transient(error: &LlmError) -> bool {
    match error {
        LlmError::Config(_) | LlmError::Cancelled { .. } | LlmError::MalformedResponse(_) => false,
        other => {
            let message = other.to_string().to_lowercase();
            if NETWORK_FAILURES.iter().any(|needle| message.contains(needle)) {
                return true;
            }

            other
                .status()
                .or_else(|| embedded_status(&other.detail()))
                .is_some_and(is_transient_status)
        }
    }
}

/// Whether an HTTP-style status code is worth retrying
///
/// Any 5xx, including the non-standard 529 "overloaded", and 429.
pub const fn is_transient_status(status: u16) -> bool {
    matches!(status, STATUS_TOO_MANY_REQUESTS | 500..=599)
}

/// Extract a status code embedded in a JSON error message
///
/// Looks at `error.code` first, then a top-level `code`. Codes may be
/// numbers or numeric strings.
pub fn embedded_status(message: &str) -> Option<u16> {
    let trimmed = message.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    let value: Value = serde_json::from_str(trimmed).ok()?;
    value
        .pointer("/error/code")
        .and_then(code_as_status)
        .or_else(|| value.get("code").and_then(code_as_status))
}

fn code_as_status(code: &Value) -> Option<u16> {
    match code {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
