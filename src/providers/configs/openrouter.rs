use secrecy::{ExposeSecret, SecretString};

use super::ProviderConfig;
use crate::errors::{Error, Result};

pub const OPENROUTER_HOST: &str = "https://openrouter.ai/api";

pub struct OpenRouterConfig {
    pub host: String,
    pub api_key: SecretString,
    /// Optional attribution headers the aggregator uses for rankings.
    pub referer: Option<String>,
    pub title: Option<String>,
}

impl OpenRouterConfig {
    pub fn new<H: Into<String>, K: Into<String>>(host: H, api_key: K) -> Self {
        Self {
            host: host.into(),
            api_key: SecretString::new(api_key.into()),
            referer: None,
            title: None,
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key.expose_secret()),
        )];
        if let Some(referer) = &self.referer {
            headers.push(("HTTP-Referer".to_string(), referer.clone()));
        }
        if let Some(title) = &self.title {
            headers.push(("X-Title".to_string(), title.clone()));
        }
        headers
    }
}

impl ProviderConfig for OpenRouterConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env("OPENROUTER_API_KEY", true, None)?
            .ok_or_else(|| Error::InvalidRequest("OpenRouter API key should be present".into()))?;
        let host = Self::get_env("OPENROUTER_API_HOST", false, Some(OPENROUTER_HOST))?
            .unwrap_or_else(|| OPENROUTER_HOST.to_string());

        let mut config = Self::new(host, api_key);
        config.referer = Self::get_env("OPENROUTER_REFERER", false, None)?;
        config.title = Self::get_env("OPENROUTER_TITLE", false, None)?;
        Ok(config)
    }
}
