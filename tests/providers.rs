use anyhow::Result;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heron::models::tool::Tool;
use heron::providers::configs::{GoogleConfig, OllamaConfig, OpenAiConfig, OpenRouterConfig};
use heron::providers::google::GoogleProvider;
use heron::providers::ollama::OllamaProvider;
use heron::providers::openai::OpenAiProvider;
use heron::providers::openrouter::OpenRouterProvider;
use heron::{ChatMessage, ChatRequest, Provider};

/// Generic test harness run against every chat provider.
struct ProviderTester {
    provider: Box<dyn Provider>,
}

impl ProviderTester {
    fn new<P: Provider + 'static>(provider: P) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    async fn test_basic_response(&self) -> Result<()> {
        let request = ChatRequest::new("test-model")
            .message(ChatMessage::system().with_text("You are a helpful assistant."))
            .message(ChatMessage::user().with_text("Just say hello!"));

        let completion = self
            .provider
            .complete(&request, &CancellationToken::new())
            .await?;

        assert!(
            !completion.message.text().is_empty(),
            "Expected text in response"
        );
        Ok(())
    }

    async fn test_tool_usage(&self) -> Result<()> {
        let weather_tool = Tool::new(
            "get_weather",
            "Get the weather for a location",
            json!({
                "type": "object",
                "required": ["location"],
                "properties": {
                    "location": {"type": "string"}
                }
            }),
        );

        let request = ChatRequest::new("test-model")
            .message(ChatMessage::user().with_text("What's the weather like in San Francisco?"))
            .tool(weather_tool);

        let completion = self
            .provider
            .complete(&request, &CancellationToken::new())
            .await?;

        let calls = completion
            .message
            .tool_calls
            .expect("Expected tool request in response");
        assert_eq!(calls[0].function.name, "get_weather");
        Ok(())
    }

    async fn run_test_suite(&self) -> Result<()> {
        self.test_basic_response().await?;
        self.test_tool_usage().await?;
        Ok(())
    }
}

/// Stand up a mock speaking the OpenAI-compatible dialect: a plain text
/// answer unless tools were offered, in which case a tool call.
async fn mock_openai_style(server: &MockServer, endpoint: &str) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(wiremock::matchers::body_partial_json(json!({"tools": [{}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-2",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"San Francisco, CA\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_openai_provider() -> Result<()> {
    let server = MockServer::start().await;
    mock_openai_style(&server, "/v1/chat/completions").await;

    let tester = ProviderTester::new(OpenAiProvider::new(OpenAiConfig::new(
        server.uri(),
        "test_api_key",
    )));
    tester.run_test_suite().await
}

#[tokio::test]
async fn test_openrouter_provider() -> Result<()> {
    let server = MockServer::start().await;
    mock_openai_style(&server, "/v1/chat/completions").await;

    let tester = ProviderTester::new(OpenRouterProvider::new(OpenRouterConfig::new(
        server.uri(),
        "test_api_key",
    )));
    tester.run_test_suite().await
}

#[tokio::test]
async fn test_ollama_provider() -> Result<()> {
    let server = MockServer::start().await;
    mock_openai_style(&server, "/v1/chat/completions").await;

    let tester = ProviderTester::new(OllamaProvider::new(OllamaConfig::new(server.uri())));
    tester.run_test_suite().await
}

#[tokio::test]
async fn test_google_provider() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(wiremock::matchers::body_partial_json(json!({"tools": [{}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "get_weather", "args": {"location": "San Francisco, CA"}}}
                ]}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello!"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 2}
        })))
        .mount(&server)
        .await;

    let tester = ProviderTester::new(GoogleProvider::new(GoogleConfig::new(
        server.uri(),
        "test_api_key",
    )));
    tester.run_test_suite().await
}
