//! Mock LLM backend speaking the `OpenAI`, Anthropic and Google dialects
//!
//! Replies are scripted per test; once the script runs out every request gets
//! a canned text answer in the dialect of the route that was hit.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Text returned when no reply is scripted
pub const DEFAULT_TEXT: &str = "Hello from mock LLM";

/// One scripted reply
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: Value,
    delay: Duration,
}

impl Reply {
    /// Successful reply with the given JSON body
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
        }
    }

    /// Error reply with the given status and JSON body
    pub fn error(status: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            body,
            delay: Duration::ZERO,
        }
    }

    /// Hold the reply back for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as received by the mock
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    /// Header value as a string, if present
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Mock backend listening on a random local port
pub struct MockBackend {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    calls: AtomicU32,
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockBackend {
    /// Start a mock that answers every request with the default reply
    pub async fn start() -> anyhow::Result<Self> {
        Self::scripted(Vec::new()).await
    }

    /// Start a mock that plays `replies` in order before falling back to the default
    pub async fn scripted(replies: Vec<Reply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            script: Mutex::new(replies.into()),
            ..MockState::default()
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle))
            .route("/v1/messages", routing::post(handle))
            .route("/v1beta/models/{model}", routing::post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for `OpenAI`-dialect and Anthropic providers
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for the Google provider
    pub fn google_base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    /// Number of requests received
    pub fn calls(&self) -> u32 {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().expect("requests lock").clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("at least one request")
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);

    let path = uri.path().to_owned();
    let reply = state.script.lock().expect("script lock").pop_front();
    let reply = reply.unwrap_or_else(|| Reply::ok(default_body(&path)));

    state.requests.lock().expect("requests lock").push(Recorded { path, headers, body });

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (reply.status, Json(reply.body)).into_response()
}

fn default_body(path: &str) -> Value {
    if path.ends_with("/chat/completions") {
        openai_text(DEFAULT_TEXT)
    } else if path.ends_with("/messages") {
        anthropic_text(DEFAULT_TEXT)
    } else {
        google_text(DEFAULT_TEXT)
    }
}

// -- Canned bodies --

/// `OpenAI` chat completion with a text answer
pub fn openai_text(text: &str) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// `OpenAI` chat completion requesting one tool call
pub fn openai_tool_call(id: &str, name: &str, arguments: &Value) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

/// `OpenAI` error body
pub fn openai_error(message: &str) -> Value {
    json!({"error": {"message": message, "type": "server_error", "code": null}})
}

/// Anthropic message with a text answer
pub fn anthropic_text(text: &str) -> Value {
    json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": "mock-model",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
}

/// Anthropic message requesting one tool use
pub fn anthropic_tool_use(id: &str, name: &str, input: &Value) -> Value {
    json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": "mock-model",
        "content": [
            {"type": "text", "text": "Let me check."},
            {"type": "tool_use", "id": id, "name": name, "input": input}
        ],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
}

/// Anthropic error body
pub fn anthropic_error(error_type: &str, message: &str) -> Value {
    json!({"type": "error", "error": {"type": error_type, "message": message}})
}

/// Google response with a text answer
pub fn google_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
    })
}

/// Google response requesting one function call, with a thought signature
pub fn google_function_call(name: &str, args: &Value, signature: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    {"text": "reasoning", "thought": true},
                    {"functionCall": {"name": name, "args": args}, "thoughtSignature": signature}
                ]
            },
            "finishReason": "STOP"
        }]
    })
}

/// Google error body
pub fn google_error(code: u16, status: &str, message: &str) -> Value {
    json!({"error": {"code": code, "message": message, "status": status}})
}
