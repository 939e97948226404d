//! Pure helpers shared by the schema adapters. Adapters call into these;
//! nothing here knows about transport or any single provider's quirks beyond
//! the OpenAI-compatible wire dialect several providers share.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::errors::{Error, Result};
use crate::models::content::{Content, ContentPart, FileRef, ImageRef, ImageSource};
use crate::models::message::{ChatMessage, ChatRole};
use crate::models::tool::{Tool, ToolCall};
use crate::models::usage::{Usage, UsageKind};
use crate::providers::base::ChatCompletion;
use crate::transport::sse::{ChatDelta, ToolCallDelta};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

/// Insert `key` only when the value is set. Providers reject explicit nulls
/// on optional fields, so an unset option must be an absent key.
pub fn insert_opt<T: Serialize>(object: &mut Map<String, Value>, key: &str, value: &Option<T>) {
    if let Some(value) = value {
        object.insert(key.to_string(), json!(value));
    }
}

/// Encode one content part in the OpenAI-compatible part shape.
pub fn content_part_to_openai(part: &ContentPart) -> Result<Value> {
    match part {
        ContentPart::Text { text } => Ok(json!({"type": "text", "text": text})),
        ContentPart::Image(image) => match image.source() {
            Some(ImageSource::Url(url)) => Ok(json!({
                "type": "image_url",
                "image_url": {"url": url}
            })),
            Some(ImageSource::Base64 { data, mime_type }) => Ok(json!({
                "type": "image_url",
                "image_url": {"url": format!("data:{mime_type};base64,{data}")}
            })),
            Some(ImageSource::FileId(file_id)) => Ok(json!({
                "type": "image_file",
                "image_file": {"file_id": file_id}
            })),
            None => Err(Error::InvalidRequest(
                "image part carries no url, data, or file id".to_string(),
            )),
        },
        ContentPart::Audio { data, format } => Ok(json!({
            "type": "input_audio",
            "input_audio": {"data": data, "format": format.to_string()}
        })),
        ContentPart::File(file) => {
            if let Some(file_id) = file.file_id.as_deref().filter(|f| !f.is_empty()) {
                Ok(json!({"type": "file", "file": {"file_id": file_id}}))
            } else if let Some(data) = file.data.as_deref().filter(|d| !d.is_empty()) {
                let mut inner = Map::new();
                inner.insert("file_data".to_string(), json!(data));
                insert_opt(&mut inner, "filename", &file.name);
                Ok(json!({"type": "file", "file": inner}))
            } else {
                Err(Error::InvalidRequest(
                    "file part carries no data or file id".to_string(),
                ))
            }
        }
    }
}

/// Decode one OpenAI-compatible part. An absent or unrecognized discriminator
/// is a parse failure, never a silent default.
pub fn content_part_from_openai(part: &Value) -> Result<ContentPart> {
    let kind = part
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| Error::Parsing("content part has no 'type' discriminator".to_string()))?;

    match kind {
        "text" => {
            let text = part
                .get("text")
                .and_then(|t| t.as_str())
                .ok_or_else(|| Error::Parsing("text part has no 'text' field".to_string()))?;
            Ok(ContentPart::text(text))
        }
        "image_url" => {
            let url = part["image_url"]
                .get("url")
                .and_then(|u| u.as_str())
                .ok_or_else(|| Error::Parsing("image_url part has no url".to_string()))?;
            match crate::models::content::split_data_uri(url) {
                Some((mime_type, data)) => {
                    Ok(ContentPart::image(ImageRef::base64(data, mime_type)))
                }
                None => Ok(ContentPart::image(ImageRef::url(url))),
            }
        }
        "image_file" => {
            let file_id = part["image_file"]
                .get("file_id")
                .and_then(|f| f.as_str())
                .ok_or_else(|| Error::Parsing("image_file part has no file_id".to_string()))?;
            Ok(ContentPart::image(ImageRef::file_id(file_id)))
        }
        "input_audio" => {
            let audio = &part["input_audio"];
            let data = audio
                .get("data")
                .and_then(|d| d.as_str())
                .ok_or_else(|| Error::Parsing("input_audio part has no data".to_string()))?;
            let format = audio
                .get("format")
                .and_then(|f| f.as_str())
                .unwrap_or("mp3")
                .parse()
                .map_err(|_| Error::Parsing("unrecognized audio format".to_string()))?;
            Ok(ContentPart::audio(data, format))
        }
        "file" => {
            let file = &part["file"];
            if let Some(file_id) = file.get("file_id").and_then(|f| f.as_str()) {
                Ok(ContentPart::file(FileRef::file_id(file_id)))
            } else if let Some(data) = file.get("file_data").and_then(|d| d.as_str()) {
                let file_ref = FileRef {
                    data: Some(data.to_string()),
                    name: file
                        .get("filename")
                        .and_then(|n| n.as_str())
                        .map(str::to_string),
                    ..Default::default()
                };
                Ok(ContentPart::file(file_ref))
            } else {
                Err(Error::Parsing(
                    "file part has no file_data or file_id".to_string(),
                ))
            }
        }
        other => Err(Error::Parsing(format!(
            "unrecognized content part discriminator '{other}'"
        ))),
    }
}

/// Encode content as the OpenAI-compatible value: a bare string when the
/// content is plain text, a parts array otherwise, order preserved.
pub fn content_to_openai(content: &Content) -> Result<Value> {
    match content {
        Content::Text(text) => Ok(json!(text)),
        Content::Parts(parts) => match parts.as_slice() {
            [ContentPart::Text { text }] => Ok(json!(text)),
            parts => Ok(Value::Array(
                parts
                    .iter()
                    .map(content_part_to_openai)
                    .collect::<Result<_>>()?,
            )),
        },
    }
}

/// Decode OpenAI-compatible content: a bare JSON string becomes text
/// content, an array is decoded part by part.
pub fn content_from_openai(value: &Value) -> Result<Content> {
    match value {
        Value::String(text) => Ok(Content::Text(text.clone())),
        Value::Array(parts) => Ok(Content::Parts(
            parts
                .iter()
                .map(content_part_from_openai)
                .collect::<Result<_>>()?,
        )),
        Value::Null => Ok(Content::Text(String::new())),
        other => Err(Error::Parsing(format!(
            "content is neither string nor array: {other}"
        ))),
    }
}

/// Convert one message into the OpenAI-compatible message object, with the
/// role string already mapped by the calling adapter.
pub fn message_to_openai(message: &ChatMessage, role: &str) -> Result<Value> {
    let mut object = Map::new();
    object.insert("role".to_string(), json!(role));

    if !message.content.is_empty() {
        object.insert("content".to_string(), content_to_openai(&message.content)?);
    }
    insert_opt(&mut object, "name", &message.name);
    insert_opt(&mut object, "tool_call_id", &message.tool_call_id);

    if let Some(calls) = &message.tool_calls {
        let calls: Vec<Value> = calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": call.call_type,
                    "function": {
                        "name": sanitize_function_name(&call.function.name),
                        "arguments": call.function.arguments,
                    }
                })
            })
            .collect();
        object.insert("tool_calls".to_string(), json!(calls));
    }

    Ok(Value::Object(object))
}

/// Convert tool definitions to the OpenAI-compatible tools array.
pub fn tools_to_openai(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut names = std::collections::HashSet::new();
    tools
        .iter()
        .map(|tool| {
            if !names.insert(tool.name.as_str()) {
                return Err(Error::InvalidRequest(format!(
                    "duplicate tool name: {}",
                    tool.name
                )));
            }
            Ok(json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            }))
        })
        .collect()
}

/// Extract a sparse usage from the OpenAI-compatible `usage` object.
pub fn usage_from_openai(response: &Value) -> Usage {
    let mut usage = Usage::new();
    let Some(wire) = response.get("usage") else {
        return usage;
    };
    if let Some(tokens) = wire.get("prompt_tokens").and_then(|v| v.as_f64()) {
        usage.record(UsageKind::InputTokens, tokens);
    }
    if let Some(tokens) = wire.get("completion_tokens").and_then(|v| v.as_f64()) {
        usage.record(UsageKind::OutputTokens, tokens);
    }
    if let Some(tokens) = wire["prompt_tokens_details"]
        .get("cached_tokens")
        .and_then(|v| v.as_f64())
    {
        usage.record(UsageKind::CachedTokens, tokens);
    }
    usage
}

/// Decode a full OpenAI-compatible chat completion, with role decoding
/// supplied by the calling adapter. Tolerant of omitted optional fields.
pub fn completion_from_openai(
    response: &Value,
    role_from_wire: fn(&str) -> Result<ChatRole>,
) -> Result<ChatCompletion> {
    let wire_message = response["choices"]
        .get(0)
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| Error::Parsing("response has no choices[0].message".to_string()))?;

    let role = match wire_message.get("role").and_then(|r| r.as_str()) {
        Some(role) => role_from_wire(role)?,
        None => ChatRole::Assistant,
    };

    let content = match wire_message.get("content") {
        Some(value) => content_from_openai(value)?,
        None => Content::Text(String::new()),
    };

    let tool_calls = wire_message
        .get("tool_calls")
        .and_then(|calls| calls.as_array())
        .map(|calls| {
            calls
                .iter()
                .map(|call| {
                    let id = call
                        .get("id")
                        .and_then(|i| i.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                    let name = call["function"]
                        .get("name")
                        .and_then(|n| n.as_str())
                        .ok_or_else(|| {
                            Error::Parsing("tool call has no function name".to_string())
                        })?;
                    // Arguments stay an opaque string, whatever they contain
                    let arguments = call["function"]
                        .get("arguments")
                        .and_then(|a| a.as_str())
                        .unwrap_or_default();
                    Ok(ToolCall::new(id, name, arguments))
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .filter(|calls: &Vec<ToolCall>| !calls.is_empty());

    let mut message = ChatMessage::assistant().with_content(content);
    message.role = role;
    message.tool_calls = tool_calls;

    Ok(ChatCompletion {
        id: response
            .get("id")
            .and_then(|i| i.as_str())
            .map(str::to_string),
        model: response
            .get("model")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        message,
        usage: usage_from_openai(response),
        finish_reason: response["choices"][0]
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(str::to_string),
    })
}

/// Decode one OpenAI-compatible streaming frame into a delta.
pub fn delta_from_openai(frame: &Value) -> Result<ChatDelta> {
    let mut delta = ChatDelta::default();

    if let Some(choice) = frame["choices"].get(0) {
        let wire_delta = &choice["delta"];
        delta.content = wire_delta
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string);
        delta.finish_reason = choice
            .get("finish_reason")
            .and_then(|f| f.as_str())
            .map(str::to_string);

        if let Some(calls) = wire_delta.get("tool_calls").and_then(|c| c.as_array()) {
            for call in calls {
                delta.tool_calls.push(ToolCallDelta {
                    index: call.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as usize,
                    id: call.get("id").and_then(|i| i.as_str()).map(str::to_string),
                    name: call["function"]
                        .get("name")
                        .and_then(|n| n.as_str())
                        .map(str::to_string),
                    arguments: call["function"]
                        .get("arguments")
                        .and_then(|a| a.as_str())
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }
    }

    let usage = usage_from_openai(frame);
    if !usage.is_empty() {
        delta.usage = Some(usage);
    }

    if delta == ChatDelta::default() {
        return Err(Error::Parsing("frame carries no delta".to_string()));
    }
    Ok(delta)
}
