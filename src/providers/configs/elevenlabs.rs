use secrecy::{ExposeSecret, SecretString};

use super::ProviderConfig;
use crate::errors::{Error, Result};

pub const ELEVENLABS_HOST: &str = "https://api.elevenlabs.io";

pub struct ElevenLabsConfig {
    pub host: String,
    pub api_key: SecretString,
}

impl ElevenLabsConfig {
    pub fn new<H: Into<String>, K: Into<String>>(host: H, api_key: K) -> Self {
        Self {
            host: host.into(),
            api_key: SecretString::new(api_key.into()),
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        vec![(
            "xi-api-key".to_string(),
            self.api_key.expose_secret().to_string(),
        )]
    }
}

impl ProviderConfig for ElevenLabsConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env("ELEVENLABS_API_KEY", true, None)?
            .ok_or_else(|| Error::InvalidRequest("ElevenLabs API key should be present".into()))?;
        let host = Self::get_env("ELEVENLABS_API_HOST", false, Some(ELEVENLABS_HOST))?
            .unwrap_or_else(|| ELEVENLABS_HOST.to_string());
        Ok(Self::new(host, api_key))
    }
}
