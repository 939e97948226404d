use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::models::content::{AudioFormat, ImageRef};
use crate::models::message::{ChatMessage, ChatRole};
use crate::models::tool::Tool;
use crate::models::usage::Usage;
use crate::transport::ChatStream;

/// Sampling and decoding options. Every field is optional; an unset field is
/// omitted from the wire entirely, never sent as null. The `top_k`, `min_p`
/// and `repetition_penalty` knobs exist only on the aggregator style and are
/// dropped by every other adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
    pub seed: Option<i64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub top_k: Option<u32>,
    pub min_p: Option<f64>,
    pub repetition_penalty: Option<f64>,
}

/// A provider-independent chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Tool>,
    pub options: ChatOptions,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new<S: Into<String>>(model: S) -> Self {
        ChatRequest {
            model: model.into(),
            messages: Vec::new(),
            tools: Vec::new(),
            options: ChatOptions::default(),
            stream: false,
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages<I: IntoIterator<Item = ChatMessage>>(mut self, messages: I) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// A provider-independent chat result.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub id: Option<String>,
    pub model: Option<String>,
    pub message: ChatMessage,
    pub usage: Usage,
    pub finish_reason: Option<String>,
}

/// The bidirectional mapping between the content model and one provider's
/// wire JSON. Implementations are pure: no I/O, no caching, no state.
///
/// `role_to_wire`/`role_from_wire` must be inverses for every role the
/// provider distinguishes; a documented lossy collapse (a provider without a
/// given role) is the only exception.
pub trait SchemaAdapter: Send + Sync {
    fn to_wire(&self, request: &ChatRequest) -> Result<serde_json::Value>;
    fn from_wire(&self, response: serde_json::Value) -> Result<ChatCompletion>;
    fn role_to_wire(&self, role: ChatRole) -> &'static str;
    fn role_from_wire(&self, role: &str) -> Result<ChatRole>;
}

/// Chat generation, implemented by every provider client.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Generate the next message for the conversation.
    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion>;

    /// Generate the next message as a lazy stream of deltas.
    async fn complete_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatStream>;
}

/// Image generation, for providers that support it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: Option<u32>,
    pub size: Option<String>,
}

impl ImageRequest {
    pub fn new<M: Into<String>, P: Into<String>>(model: M, prompt: P) -> Self {
        ImageRequest {
            model: model.into(),
            prompt: prompt.into(),
            n: None,
            size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageResponse {
    pub images: Vec<ImageRef>,
    pub usage: Usage,
}

#[async_trait]
pub trait ImageGeneration: Send + Sync {
    async fn generate_image(
        &self,
        request: &ImageRequest,
        cancel: &CancellationToken,
    ) -> Result<ImageResponse>;
}

/// Speech synthesis, for providers that support it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub model: String,
    pub voice: String,
    pub text: String,
    pub format: Option<AudioFormat>,
    pub voice_settings: Option<VoiceSettings>,
}

impl SpeechRequest {
    pub fn new<M, V, T>(model: M, voice: V, text: T) -> Self
    where
        M: Into<String>,
        V: Into<String>,
        T: Into<String>,
    {
        SpeechRequest {
            model: model.into(),
            voice: voice.into(),
            text: text.into(),
            format: None,
            voice_settings: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechResponse {
    pub audio: Vec<u8>,
    pub format: AudioFormat,
    pub usage: Usage,
}

#[async_trait]
pub trait SpeechGeneration: Send + Sync {
    async fn generate_speech(
        &self,
        request: &SpeechRequest,
        cancel: &CancellationToken,
    ) -> Result<SpeechResponse>;
}
