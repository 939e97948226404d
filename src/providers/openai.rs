use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use super::base::{
    ChatCompletion, ChatRequest, ImageGeneration, ImageRequest, ImageResponse, Provider,
    SchemaAdapter,
};
use super::configs::OpenAiConfig;
use super::utils::{
    completion_from_openai, delta_from_openai, insert_opt, message_to_openai, tools_to_openai,
};
use crate::errors::{Error, Result};
use crate::models::content::ImageRef;
use crate::models::message::ChatRole;
use crate::models::usage::{Usage, UsageKind};
use crate::transport::{decode_sse, poll_until, ChatStream, Executor, PollSpec, RequestSpec};

/// Schema adapter for the OpenAI wire dialect. Pure mappings only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl OpenAiAdapter {
    fn role_from(role: &str) -> Result<ChatRole> {
        match role {
            "system" => Ok(ChatRole::System),
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "tool" => Ok(ChatRole::Tool),
            "developer" => Ok(ChatRole::Developer),
            other => Err(Error::Parsing(format!("unrecognized role '{other}'"))),
        }
    }
}

impl SchemaAdapter for OpenAiAdapter {
    fn to_wire(&self, request: &ChatRequest) -> Result<Value> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|message| message_to_openai(message, self.role_to_wire(message.role)))
            .collect::<Result<_>>()?;

        let mut body = Map::new();
        body.insert("model".to_string(), json!(request.model));
        body.insert("messages".to_string(), json!(messages));
        if request.stream {
            body.insert("stream".to_string(), json!(true));
            body.insert("stream_options".to_string(), json!({"include_usage": true}));
        }

        let options = &request.options;
        insert_opt(&mut body, "temperature", &options.temperature);
        insert_opt(&mut body, "top_p", &options.top_p);
        insert_opt(&mut body, "max_tokens", &options.max_tokens);
        insert_opt(&mut body, "stop", &options.stop);
        insert_opt(&mut body, "seed", &options.seed);
        insert_opt(&mut body, "frequency_penalty", &options.frequency_penalty);
        insert_opt(&mut body, "presence_penalty", &options.presence_penalty);
        // top_k / min_p / repetition_penalty are aggregator-only and must not
        // appear here, not even as null

        if !request.tools.is_empty() {
            body.insert("tools".to_string(), json!(tools_to_openai(&request.tools)?));
        }

        Ok(Value::Object(body))
    }

    fn from_wire(&self, response: Value) -> Result<ChatCompletion> {
        completion_from_openai(&response, Self::role_from)
    }

    fn role_to_wire(&self, role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
            ChatRole::Developer => "developer",
        }
    }

    fn role_from_wire(&self, role: &str) -> Result<ChatRole> {
        Self::role_from(role)
    }
}

pub struct OpenAiProvider {
    executor: Executor,
    config: OpenAiConfig,
    adapter: OpenAiAdapter,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            executor: Executor::new(),
            config,
            adapter: OpenAiAdapter,
        }
    }

    pub fn from_env() -> Result<Self> {
        use super::configs::ProviderConfig;
        Ok(Self::new(OpenAiConfig::from_env()?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.host.trim_end_matches('/'))
    }

    fn spec(&self, path: &str, body: Value) -> RequestSpec {
        self.config
            .headers()
            .into_iter()
            .fold(RequestSpec::post(self.url(path)).json(body), |spec, (k, v)| {
                spec.header(k, v)
            })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let request = request.clone().streaming(false);
        let body = self.adapter.to_wire(&request)?;
        let response = self
            .executor
            .execute(&self.spec("/v1/chat/completions", body), cancel)
            .await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }
        let payload = response.json()?;
        if let Some(envelope) = payload.get("error").filter(|e| !e.is_null()) {
            let message = envelope
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown provider error");
            return Err(Error::provider(message, None));
        }
        self.adapter.from_wire(payload)
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatStream> {
        let request = request.clone().streaming(true);
        let body = self.adapter.to_wire(&request)?;
        let bytes = self
            .executor
            .execute_stream(&self.spec("/v1/chat/completions", body), cancel)
            .await?;
        Ok(decode_sse(bytes, delta_from_openai, cancel.clone()))
    }
}

#[async_trait]
impl ImageGeneration for OpenAiProvider {
    /// Generate images. A synchronous response carries `data` directly; some
    /// compatible servers answer with a job id instead, which is polled until
    /// it reports completion.
    async fn generate_image(
        &self,
        request: &ImageRequest,
        cancel: &CancellationToken,
    ) -> Result<ImageResponse> {
        let mut body = Map::new();
        body.insert("model".to_string(), json!(request.model));
        body.insert("prompt".to_string(), json!(request.prompt));
        insert_opt(&mut body, "n", &request.n);
        insert_opt(&mut body, "size", &request.size);

        let response = self
            .executor
            .execute(
                &self.spec("/v1/images/generations", Value::Object(body)),
                cancel,
            )
            .await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }
        let mut payload = response.json()?;

        if payload.get("data").is_none() {
            let job_id = payload
                .get("id")
                .and_then(|i| i.as_str())
                .ok_or_else(|| {
                    Error::Parsing("image response has neither data nor job id".to_string())
                })?
                .to_string();
            let poll = self
                .config
                .headers()
                .into_iter()
                .fold(
                    PollSpec::new(self.url(&format!("/v1/images/generations/{job_id}"))),
                    |spec, (k, v)| spec.header(k, v),
                );
            payload = poll_until(
                &self.executor,
                &poll,
                |status| {
                    status
                        .get("status")
                        .and_then(|s| s.as_str())
                        .map(|s| s == "completed")
                        .unwrap_or(false)
                },
                None,
                cancel,
            )
            .await?;
        }

        let images = payload["data"]
            .as_array()
            .ok_or_else(|| Error::Parsing("image response has no data array".to_string()))?
            .iter()
            .map(|entry| {
                if let Some(url) = entry.get("url").and_then(|u| u.as_str()) {
                    Ok(ImageRef::url(url))
                } else if let Some(data) = entry.get("b64_json").and_then(|d| d.as_str()) {
                    Ok(ImageRef::base64(data, "image/png"))
                } else {
                    Err(Error::Parsing(
                        "image entry has neither url nor b64_json".to_string(),
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let usage = Usage::new().with(UsageKind::Images, images.len() as f64);
        Ok(ImageResponse { images, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ChatMessage;
    use crate::transport::StreamEvent;
    use futures_util::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig::new(server.uri(), "test_api_key"))
    }

    #[tokio::test]
    async fn test_complete_basic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-123",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "Hello! How can I assist you today?"
                    },
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27}
            })))
            .mount(&server)
            .await;

        let request = ChatRequest::new("gpt-4o")
            .message(ChatMessage::user().with_text("Hello?"));
        let completion = provider_for(&server)
            .complete(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            completion.message.text(),
            "Hello! How can I assist you today?"
        );
        assert_eq!(completion.usage.get(UsageKind::InputTokens), Some(12.0));
        assert_eq!(completion.usage.get(UsageKind::OutputTokens), Some(15.0));
    }

    #[tokio::test]
    async fn test_complete_tool_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-tool",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_123",
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
            .mount(&server)
            .await;

        let request = ChatRequest::new("gpt-4o")
            .message(ChatMessage::user().with_text("What's the weather in San Francisco?"))
            .tool(crate::models::tool::Tool::new(
                "get_weather",
                "Gets the current weather for a location",
                json!({"type": "object", "properties": {"location": {"type": "string"}}}),
            ));

        let completion = provider_for(&server)
            .complete(&request, &CancellationToken::new())
            .await
            .unwrap();

        let calls = completion.message.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(
            calls[0].function.arguments,
            "{\"location\":\"San Francisco, CA\"}"
        );
    }

    #[tokio::test]
    async fn test_options_omitted_when_unset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .mount(&server)
            .await;

        let request = ChatRequest::new("gpt-4o").message(ChatMessage::user().with_text("hi"));
        let body = OpenAiAdapter.to_wire(&request).unwrap();

        let object = body.as_object().unwrap();
        assert!(!object.contains_key("temperature"));
        assert!(!object.contains_key("stop"));
        assert!(!object.contains_key("top_k"));
        assert!(!object.values().any(|v| v.is_null()));

        // and the request itself goes through
        provider_for(&server)
            .complete(&request, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_role_round_trip() {
        let adapter = OpenAiAdapter;
        for role in ChatRole::ALL {
            let wire = adapter.role_to_wire(role);
            assert_eq!(adapter.role_from_wire(wire).unwrap(), role);
        }
    }

    #[tokio::test]
    async fn test_server_error_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"message": "The server had an error", "type": "server_error"}
            })))
            .mount(&server)
            .await;

        let request = ChatRequest::new("gpt-4o").message(ChatMessage::user().with_text("hi"));
        let err = provider_for(&server)
            .complete(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            Error::Provider { message, .. } => assert_eq!(message, "The server had an error"),
            other => panic!("Expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_stream() {
        let server = MockServer::start().await;
        let sse_body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                        data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                        data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let request = ChatRequest::new("gpt-4o").message(ChatMessage::user().with_text("hi"));
        let stream = provider_for(&server)
            .complete_stream(&request, &CancellationToken::new())
            .await
            .unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], StreamEvent::Delta(d) if d.content.as_deref() == Some("Hel")));
        assert_eq!(events[2], StreamEvent::Done);
    }

    #[tokio::test]
    async fn test_generate_image_sync() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1700000000,
                "data": [{"url": "https://images.example.com/1.png"}]
            })))
            .mount(&server)
            .await;

        let response = provider_for(&server)
            .generate_image(
                &ImageRequest::new("dall-e-3", "a heron at dawn"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.images.len(), 1);
        assert_eq!(response.usage.get(UsageKind::Images), Some(1.0));
    }

    #[tokio::test]
    async fn test_generate_image_polls_async_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "job-7", "status": "queued"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/images/generations/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "data": [{"b64_json": "aW1n"}]
            })))
            .mount(&server)
            .await;

        let response = provider_for(&server)
            .generate_image(
                &ImageRequest::new("dall-e-3", "a heron at dusk"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.images.len(), 1);
        assert_eq!(response.images[0].data.as_deref(), Some("aW1n"));
    }
}
