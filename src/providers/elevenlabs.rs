use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use super::base::{SpeechGeneration, SpeechRequest, SpeechResponse};
use super::configs::ElevenLabsConfig;
use super::utils::insert_opt;
use crate::errors::{Error, Result};
use crate::models::content::AudioFormat;
use crate::models::usage::{Usage, UsageKind};
use crate::transport::{Executor, FormField, RequestSpec};

/// Pure request/response mappings for the speech dialect. This provider has
/// no chat surface; its adapter maps speech requests instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElevenLabsAdapter;

impl ElevenLabsAdapter {
    /// The wire name of an output format. Not every neutral format has a
    /// counterpart on this provider.
    pub fn output_format(format: AudioFormat) -> Result<&'static str> {
        match format {
            AudioFormat::Mp3 => Ok("mp3_44100_128"),
            AudioFormat::Pcm16 => Ok("pcm_16000"),
            AudioFormat::Ogg => Ok("opus_48000"),
            AudioFormat::Wav | AudioFormat::Flac => Err(Error::InvalidRequest(format!(
                "output format '{format}' is not supported by this provider"
            ))),
        }
    }

    pub fn speech_to_wire(request: &SpeechRequest) -> Value {
        let mut body = Map::new();
        body.insert("text".to_string(), json!(request.text));
        body.insert("model_id".to_string(), json!(request.model));
        insert_opt(&mut body, "voice_settings", &request.voice_settings);
        Value::Object(body)
    }
}

/// A speech-to-text request. The audio travels as a multipart file part.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionRequest {
    pub model: String,
    pub audio: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub language: Option<String>,
}

impl TranscriptionRequest {
    pub fn new<M: Into<String>>(model: M, audio: Vec<u8>) -> Self {
        TranscriptionRequest {
            model: model.into(),
            audio,
            file_name: "audio.mp3".to_string(),
            mime_type: "audio/mpeg".to_string(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResponse {
    pub text: String,
    pub language: Option<String>,
    pub usage: Usage,
}

pub struct ElevenLabsProvider {
    executor: Executor,
    config: ElevenLabsConfig,
}

impl ElevenLabsProvider {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self {
            executor: Executor::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        use super::configs::ProviderConfig;
        Ok(Self::new(ElevenLabsConfig::from_env()?))
    }

    pub fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn spec(&self, path: &str) -> RequestSpec {
        let url = format!("{}{path}", self.config.host.trim_end_matches('/'));
        self.config
            .headers()
            .into_iter()
            .fold(RequestSpec::post(url), |spec, (k, v)| spec.header(k, v))
    }

    /// Transcribe recorded audio. The audio bytes go out as a multipart file
    /// part alongside the string fields.
    pub async fn transcribe(
        &self,
        request: &TranscriptionRequest,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionResponse> {
        let mut fields = vec![
            FormField::text("model_id", &request.model),
            FormField::file(
                "file",
                request.audio.clone(),
                &request.file_name,
                &request.mime_type,
            ),
        ];
        if let Some(language) = &request.language {
            fields.push(FormField::text("language_code", language));
        }

        let spec = self.spec("/v1/speech-to-text").multipart(fields);
        let response = self.executor.execute(&spec, cancel).await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }

        let payload = response.json()?;
        let text = payload
            .get("text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Error::Parsing("transcription response has no text".to_string()))?
            .to_string();

        let usage = Usage::new().with(UsageKind::Characters, text.chars().count() as f64);
        Ok(TranscriptionResponse {
            text,
            language: payload
                .get("language_code")
                .and_then(|l| l.as_str())
                .map(str::to_string),
            usage,
        })
    }
}

#[async_trait]
impl SpeechGeneration for ElevenLabsProvider {
    /// Synthesize speech. The response body is raw audio, not JSON; failures
    /// still arrive as JSON error envelopes and are categorized as usual.
    async fn generate_speech(
        &self,
        request: &SpeechRequest,
        cancel: &CancellationToken,
    ) -> Result<SpeechResponse> {
        let format = request.format.unwrap_or(AudioFormat::Mp3);
        let spec = self
            .spec(&format!("/v1/text-to-speech/{}", request.voice))
            .query("output_format", ElevenLabsAdapter::output_format(format)?)
            .json(ElevenLabsAdapter::speech_to_wire(request));

        let response = self.executor.execute(&spec, cancel).await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }

        let usage = Usage::new().with(
            UsageKind::Characters,
            request.text.chars().count() as f64,
        );
        Ok(SpeechResponse {
            audio: response.body,
            format,
            usage,
        })
    }
}
