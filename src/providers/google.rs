use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use super::base::{ChatCompletion, ChatRequest, Provider, SchemaAdapter};
use super::configs::GoogleConfig;
use super::utils::insert_opt;
use crate::errors::{Error, Result};
use crate::models::content::{Content, ContentPart, ImageRef, ImageSource};
use crate::models::message::{ChatMessage, ChatRole};
use crate::models::tool::ToolCall;
use crate::models::usage::{Usage, UsageKind};
use crate::transport::{decode_sse, ChatDelta, ChatStream, Executor, RequestSpec, ToolCallDelta};

/// Schema adapter for the Google generative-language wire dialect.
///
/// This dialect knows only two conversation roles, `user` and `model`.
/// Assistant maps to `model`; System and Developer messages are lifted out of
/// the contents array into `systemInstruction`; Tool results travel as
/// `functionResponse` parts under the `user` role. These collapses are lossy
/// by design and asserted in the tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleAdapter;

impl GoogleAdapter {
    fn part_to_wire(part: &ContentPart) -> Result<Value> {
        match part {
            ContentPart::Text { text } => Ok(json!({"text": text})),
            ContentPart::Image(image) => match image.source() {
                Some(ImageSource::Base64 { data, mime_type }) => Ok(json!({
                    "inlineData": {"mimeType": mime_type, "data": data}
                })),
                Some(ImageSource::Url(url)) => Ok(json!({
                    "fileData": {"fileUri": url}
                })),
                Some(ImageSource::FileId(file_id)) => Ok(json!({
                    "fileData": {"fileUri": file_id}
                })),
                None => Err(Error::InvalidRequest(
                    "image part carries no url, data, or file id".to_string(),
                )),
            },
            ContentPart::Audio { data, format } => Ok(json!({
                "inlineData": {"mimeType": format!("audio/{format}"), "data": data}
            })),
            ContentPart::File(file) => {
                if let Some(uri) = file.file_id.as_deref() {
                    Ok(json!({"fileData": {"fileUri": uri}}))
                } else if let Some(data) = file.data.as_deref() {
                    Ok(json!({
                        "inlineData": {"mimeType": "application/octet-stream", "data": data}
                    }))
                } else {
                    Err(Error::InvalidRequest(
                        "file part carries no data or file id".to_string(),
                    ))
                }
            }
        }
    }

    fn content_to_parts(content: &Content) -> Result<Vec<Value>> {
        match content {
            Content::Text(text) => Ok(vec![json!({"text": text})]),
            Content::Parts(parts) => parts.iter().map(Self::part_to_wire).collect(),
        }
    }

    fn message_to_wire(&self, message: &ChatMessage) -> Result<Value> {
        let mut parts = Self::content_to_parts(&message.content)?;

        if message.role == ChatRole::Tool {
            let name = message
                .name
                .clone()
                .or_else(|| message.tool_call_id.clone())
                .unwrap_or_default();
            parts = vec![json!({
                "functionResponse": {
                    "name": name,
                    "response": {"content": message.content.all_text()}
                }
            })];
        }

        if let Some(calls) = &message.tool_calls {
            for call in calls {
                // The wire wants structured args; fall back on the raw string
                // when the opaque arguments do not parse
                let args: Value = serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| json!(call.function.arguments));
                parts.push(json!({
                    "functionCall": {"name": call.function.name, "args": args}
                }));
            }
        }

        Ok(json!({
            "role": self.role_to_wire(message.role),
            "parts": parts
        }))
    }

    fn part_from_wire(part: &Value) -> Result<Option<ContentPart>> {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            return Ok(Some(ContentPart::text(text)));
        }
        if let Some(inline) = part.get("inlineData") {
            let mime_type = inline
                .get("mimeType")
                .and_then(|m| m.as_str())
                .unwrap_or("image/png");
            let data = inline
                .get("data")
                .and_then(|d| d.as_str())
                .ok_or_else(|| Error::Parsing("inlineData part has no data".to_string()))?;
            if let Some(format) = mime_type
                .strip_prefix("audio/")
                .and_then(|f| f.parse().ok())
            {
                return Ok(Some(ContentPart::audio(data, format)));
            }
            return Ok(Some(ContentPart::image(ImageRef::base64(data, mime_type))));
        }
        if let Some(file) = part.get("fileData") {
            let uri = file
                .get("fileUri")
                .and_then(|u| u.as_str())
                .ok_or_else(|| Error::Parsing("fileData part has no fileUri".to_string()))?;
            return Ok(Some(ContentPart::image(ImageRef::url(uri))));
        }
        // functionCall parts are handled at the message level
        if part.get("functionCall").is_some() {
            return Ok(None);
        }
        Err(Error::Parsing(format!("unrecognized part shape: {part}")))
    }

    fn usage_from_wire(response: &Value) -> Usage {
        let mut usage = Usage::new();
        let Some(metadata) = response.get("usageMetadata") else {
            return usage;
        };
        if let Some(tokens) = metadata.get("promptTokenCount").and_then(|v| v.as_f64()) {
            usage.record(UsageKind::InputTokens, tokens);
        }
        if let Some(tokens) = metadata
            .get("candidatesTokenCount")
            .and_then(|v| v.as_f64())
        {
            usage.record(UsageKind::OutputTokens, tokens);
        }
        if let Some(tokens) = metadata
            .get("cachedContentTokenCount")
            .and_then(|v| v.as_f64())
        {
            usage.record(UsageKind::CachedTokens, tokens);
        }
        usage
    }
}

impl SchemaAdapter for GoogleAdapter {
    fn to_wire(&self, request: &ChatRequest) -> Result<Value> {
        let mut body = Map::new();

        // System and Developer messages become the system instruction
        let instruction: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| matches!(m.role, ChatRole::System | ChatRole::Developer))
            .map(|m| Ok(json!({"text": m.content.all_text()})))
            .collect::<Result<_>>()?;
        if !instruction.is_empty() {
            body.insert(
                "systemInstruction".to_string(),
                json!({"parts": instruction}),
            );
        }

        let contents: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| !matches!(m.role, ChatRole::System | ChatRole::Developer))
            .map(|m| self.message_to_wire(m))
            .collect::<Result<_>>()?;
        body.insert("contents".to_string(), json!(contents));

        let options = &request.options;
        let mut generation = Map::new();
        insert_opt(&mut generation, "temperature", &options.temperature);
        insert_opt(&mut generation, "topP", &options.top_p);
        insert_opt(&mut generation, "maxOutputTokens", &options.max_tokens);
        insert_opt(&mut generation, "stopSequences", &options.stop);
        insert_opt(&mut generation, "seed", &options.seed);
        if !generation.is_empty() {
            body.insert("generationConfig".to_string(), Value::Object(generation));
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    })
                })
                .collect();
            body.insert(
                "tools".to_string(),
                json!([{"functionDeclarations": declarations}]),
            );
        }

        Ok(Value::Object(body))
    }

    fn from_wire(&self, response: Value) -> Result<ChatCompletion> {
        let candidate = response["candidates"]
            .get(0)
            .ok_or_else(|| Error::Parsing("response has no candidates".to_string()))?;

        let wire_parts = candidate["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();
        for wire_part in &wire_parts {
            if let Some(call) = wire_part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| Error::Parsing("functionCall has no name".to_string()))?;
                let args = call.get("args").cloned().unwrap_or(json!({}));
                tool_calls.push(ToolCall::generated(name, args.to_string()));
            } else if let Some(part) = Self::part_from_wire(wire_part)? {
                parts.push(part);
            }
        }

        let role = match candidate["content"].get("role").and_then(|r| r.as_str()) {
            Some(role) => self.role_from_wire(role)?,
            None => ChatRole::Assistant,
        };

        let mut message = ChatMessage::assistant().with_content(Content::Parts(parts));
        message.role = role;
        if !tool_calls.is_empty() {
            message.tool_calls = Some(tool_calls);
        }

        Ok(ChatCompletion {
            id: response
                .get("responseId")
                .and_then(|i| i.as_str())
                .map(str::to_string),
            model: response
                .get("modelVersion")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            message,
            usage: Self::usage_from_wire(&response),
            finish_reason: candidate
                .get("finishReason")
                .and_then(|f| f.as_str())
                .map(str::to_string),
        })
    }

    fn role_to_wire(&self, role: ChatRole) -> &'static str {
        match role {
            ChatRole::Assistant => "model",
            // user is the only other role this dialect knows
            ChatRole::User | ChatRole::System | ChatRole::Developer | ChatRole::Tool => "user",
        }
    }

    fn role_from_wire(&self, role: &str) -> Result<ChatRole> {
        match role {
            "user" => Ok(ChatRole::User),
            "model" => Ok(ChatRole::Assistant),
            other => Err(Error::Parsing(format!("unrecognized role '{other}'"))),
        }
    }
}

/// Decode one streaming frame of the generative-language dialect.
pub fn delta_from_google(frame: &Value) -> Result<ChatDelta> {
    let mut delta = ChatDelta::default();

    if let Some(candidate) = frame["candidates"].get(0) {
        let mut text = String::new();
        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(run) = part.get("text").and_then(|t| t.as_str()) {
                    text.push_str(run);
                }
                if let Some(call) = part.get("functionCall") {
                    delta.tool_calls.push(ToolCallDelta {
                        index: delta.tool_calls.len(),
                        id: None,
                        name: call
                            .get("name")
                            .and_then(|n| n.as_str())
                            .map(str::to_string),
                        arguments: call.get("args").map(|a| a.to_string()).unwrap_or_default(),
                    });
                }
            }
        }
        if !text.is_empty() {
            delta.content = Some(text);
        }
        delta.finish_reason = candidate
            .get("finishReason")
            .and_then(|f| f.as_str())
            .map(str::to_string);
    }

    let usage = GoogleAdapter::usage_from_wire(frame);
    if !usage.is_empty() {
        delta.usage = Some(usage);
    }

    if delta == ChatDelta::default() {
        return Err(Error::Parsing("frame carries no delta".to_string()));
    }
    Ok(delta)
}

pub struct GoogleProvider {
    executor: Executor,
    config: GoogleConfig,
    adapter: GoogleAdapter,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            executor: Executor::new(),
            config,
            adapter: GoogleAdapter,
        }
    }

    pub fn from_env() -> Result<Self> {
        use super::configs::ProviderConfig;
        Ok(Self::new(GoogleConfig::from_env()?))
    }

    fn spec(&self, model: &str, action: &str, body: Value) -> RequestSpec {
        let url = format!(
            "{}/v1beta/models/{model}:{action}",
            self.config.host.trim_end_matches('/')
        );
        self.config.apply_auth(RequestSpec::post(url).json(body))
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let body = self.adapter.to_wire(request)?;
        let response = self
            .executor
            .execute(&self.spec(&request.model, "generateContent", body), cancel)
            .await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }
        self.adapter.from_wire(response.json()?)
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatStream> {
        let body = self.adapter.to_wire(request)?;
        let spec = self
            .spec(&request.model, "streamGenerateContent", body)
            .query("alt", "sse");
        let bytes = self.executor.execute_stream(&spec, cancel).await?;
        Ok(decode_sse(bytes, delta_from_google, cancel.clone()))
    }
}
