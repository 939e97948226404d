//! Read-only provider configuration: base URL, API key, and extra headers.
//! Built once (usually from the environment) and consulted per request;
//! nothing in the transport layer ever mutates a config.
use std::env;

use crate::errors::{Error, Result};

pub mod elevenlabs;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod openrouter;

pub use elevenlabs::ElevenLabsConfig;
pub use google::GoogleConfig;
pub use ollama::OllamaConfig;
pub use openai::OpenAiConfig;
pub use openrouter::OpenRouterConfig;

pub trait ProviderConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self>
    where
        Self: Sized;

    /// Helper to read environment variables with required/default handling
    fn get_env(key: &str, required: bool, default: Option<&str>) -> Result<Option<String>> {
        match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) if !required => {
                Ok(default.map(str::to_string))
            }
            Err(env::VarError::NotPresent) => Err(Error::InvalidRequest(format!(
                "environment variable '{key}' is required but not set"
            ))),
            Err(e) => Err(Error::InvalidRequest(format!(
                "environment variable '{key}': {e}"
            ))),
        }
    }
}
