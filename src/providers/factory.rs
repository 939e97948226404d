use tokio_util::sync::CancellationToken;

use super::base::{ChatCompletion, ChatRequest, Provider};
use super::google::GoogleProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::openrouter::OpenRouterProvider;
use crate::errors::{Error, Result};
use crate::models::capability::ProviderKind;
use crate::transport::ChatStream;

/// Build a chat provider from environment configuration.
///
/// The speech provider has no chat surface and is constructed directly via
/// `ElevenLabsProvider::from_env`.
pub fn get_provider(kind: ProviderKind) -> Result<Box<dyn Provider>> {
    match kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::from_env()?)),
        ProviderKind::Google => Ok(Box::new(GoogleProvider::from_env()?)),
        ProviderKind::Ollama => Ok(Box::new(OllamaProvider::from_env()?)),
        ProviderKind::OpenRouter => Ok(Box::new(OpenRouterProvider::from_env()?)),
        ProviderKind::ElevenLabs => Err(Error::InvalidRequest(
            "elevenlabs has no chat surface".to_string(),
        )),
    }
}

/// Lets a boxed provider be used where a concrete one is expected.
#[async_trait::async_trait]
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        (**self).complete(request, cancel).await
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatStream> {
        (**self).complete_stream(request, cancel).await
    }
}
