mod harness;

use cerebro_llm::{ChatRequest, ContentBlock, LlmError, Message, Role, StopReason, SystemPrompt, ToolSpec};
use cerebro_llm::types::TextBlock;
use harness::config::{brain, provider};
use harness::mock_backend::{DEFAULT_TEXT, MockBackend, Reply, anthropic_error, anthropic_tool_use};
use serde_json::json;

const MODEL: &str = "claude-sonnet-4-20250514";

#[tokio::test]
async fn chat_sends_messages_api_request() {
    let mock = MockBackend::start().await.unwrap();
    let provider = provider(&brain("anthropic", MODEL, &mock.base_url()));
    let request = ChatRequest::new(
        SystemPrompt::Blocks(vec![TextBlock::new("You are terse."), TextBlock::new("Answer in English.")]),
        vec![Message::user("Hello")],
    );

    let result = provider.chat(&request, None).await.unwrap();
    assert_eq!(result.text(), DEFAULT_TEXT);

    let recorded = mock.last_request();
    assert_eq!(recorded.path, "/v1/messages");
    assert_eq!(recorded.header("x-api-key"), Some("test-key"));
    assert_eq!(recorded.header("anthropic-version"), Some("2023-06-01"));
    assert!(recorded.header("authorization").is_none());
    assert_eq!(recorded.body["model"], MODEL);
    assert_eq!(recorded.body["max_tokens"], 256);
    assert_eq!(recorded.body["system"][1]["text"], "Answer in English.");
    assert_eq!(recorded.body["messages"], json!([{"role": "user", "content": "Hello"}]));
}

#[tokio::test]
async fn tool_use_round_trip() {
    let mock = MockBackend::scripted(vec![Reply::ok(anthropic_tool_use(
        "toolu_01",
        "get_weather",
        &json!({"city": "Paris"}),
    ))])
    .await
    .unwrap();
    let provider = provider(&brain("anthropic", MODEL, &mock.base_url()));
    let tools = vec![ToolSpec::new(
        "get_weather",
        "Current weather for a city",
        json!({"type": "object", "properties": {"city": {"type": "string"}}}),
    )];

    let first = ChatRequest::new("", vec![Message::user("Weather in Paris?")]).with_tools(tools.clone());
    let result = provider.chat(&first, None).await.unwrap();

    assert_eq!(result.stop_reason(), StopReason::ToolUse);
    assert_eq!(result.text(), "Let me check.");
    assert_eq!(result.tool_calls()[0].id, "toolu_01");

    let second = ChatRequest::new(
        "",
        vec![
            Message::user("Weather in Paris?"),
            result.to_message(),
            Message::blocks(Role::User, vec![ContentBlock::tool_result("toolu_01", "18C and sunny")]),
        ],
    )
    .with_tools(tools);
    provider.chat(&second, None).await.unwrap();

    let messages = mock.last_request().body["messages"].clone();
    assert_eq!(messages[1]["content"][0], json!({"type": "text", "text": "Let me check."}));
    assert_eq!(
        messages[1]["content"][1],
        json!({"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {"city": "Paris"}})
    );
    assert_eq!(
        messages[2]["content"][0],
        json!({"type": "tool_result", "tool_use_id": "toolu_01", "content": "18C and sunny"})
    );
}

#[tokio::test]
async fn overloaded_is_retried() {
    let mock = MockBackend::scripted(vec![Reply::error(529, anthropic_error("overloaded_error", "Overloaded"))])
        .await
        .unwrap();
    let provider = provider(&brain("anthropic", MODEL, &mock.base_url()));

    let result = provider.chat(&ChatRequest::new("", vec![Message::user("Hi")]), None).await.unwrap();

    assert_eq!(result.text(), DEFAULT_TEXT);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn authentication_error_is_normalized() {
    let mock = MockBackend::scripted(vec![Reply::error(
        401,
        anthropic_error("authentication_error", "invalid x-api-key"),
    )])
    .await
    .unwrap();
    let provider = provider(&brain("anthropic", MODEL, &mock.base_url()));

    let err = provider
        .chat(&ChatRequest::new("", vec![Message::user("Hi")]), None)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Upstream { status: Some(401), .. }));
    assert_eq!(err.to_string(), "upstream error: invalid x-api-key");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn ping_limits_output() {
    let mock = MockBackend::start().await.unwrap();
    let provider = provider(&brain("anthropic", MODEL, &mock.base_url()));

    provider.ping().await.unwrap();

    let body = mock.last_request().body;
    assert_eq!(body["max_tokens"], 1);
    assert!(body.get("system").is_none());
}
