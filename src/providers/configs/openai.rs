use secrecy::{ExposeSecret, SecretString};

use super::ProviderConfig;
use crate::errors::{Error, Result};

pub const OPENAI_HOST: &str = "https://api.openai.com";

pub struct OpenAiConfig {
    pub host: String,
    pub api_key: SecretString,
    pub organization: Option<String>,
    pub project: Option<String>,
}

impl OpenAiConfig {
    pub fn new<H: Into<String>, K: Into<String>>(host: H, api_key: K) -> Self {
        Self {
            host: host.into(),
            api_key: SecretString::new(api_key.into()),
            organization: None,
            project: None,
        }
    }

    /// Auth and scoping headers for every request to this provider.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key.expose_secret()),
        )];
        if let Some(org) = &self.organization {
            headers.push(("OpenAI-Organization".to_string(), org.clone()));
        }
        if let Some(project) = &self.project {
            headers.push(("OpenAI-Project".to_string(), project.clone()));
        }
        headers
    }
}

impl ProviderConfig for OpenAiConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env("OPENAI_API_KEY", true, None)?
            .ok_or_else(|| Error::InvalidRequest("OpenAI API key should be present".into()))?;
        let host = Self::get_env("OPENAI_API_HOST", false, Some(OPENAI_HOST))?
            .unwrap_or_else(|| OPENAI_HOST.to_string());

        let mut config = Self::new(host, api_key);
        config.organization = Self::get_env("OPENAI_ORGANIZATION", false, None)?;
        config.project = Self::get_env("OPENAI_PROJECT", false, None)?;
        Ok(config)
    }
}
