use super::ProviderConfig;
use crate::errors::Result;

pub const OLLAMA_HOST: &str = "http://localhost:11434";

/// A local server needs no credentials, only a host.
pub struct OllamaConfig {
    pub host: String,
}

impl OllamaConfig {
    pub fn new<H: Into<String>>(host: H) -> Self {
        Self { host: host.into() }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(OLLAMA_HOST)
    }
}

impl ProviderConfig for OllamaConfig {
    fn from_env() -> Result<Self> {
        let host = Self::get_env("OLLAMA_HOST", false, Some(OLLAMA_HOST))?
            .unwrap_or_else(|| OLLAMA_HOST.to_string());
        Ok(Self::new(host))
    }
}
