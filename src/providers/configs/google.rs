use secrecy::{ExposeSecret, SecretString};

use super::ProviderConfig;
use crate::errors::{Error, Result};
use crate::transport::RequestSpec;

pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";

pub struct GoogleConfig {
    pub host: String,
    pub api_key: SecretString,
}

impl GoogleConfig {
    pub fn new<H: Into<String>, K: Into<String>>(host: H, api_key: K) -> Self {
        Self {
            host: host.into(),
            api_key: SecretString::new(api_key.into()),
        }
    }

    /// This provider places the API key in the query string, not a header.
    pub fn apply_auth(&self, spec: RequestSpec) -> RequestSpec {
        spec.query("key", self.api_key.expose_secret())
    }
}

impl ProviderConfig for GoogleConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env("GEMINI_API_KEY", true, None)?
            .ok_or_else(|| Error::InvalidRequest("Gemini API key should be present".into()))?;
        let host = Self::get_env("GEMINI_API_HOST", false, Some(GOOGLE_HOST))?
            .unwrap_or_else(|| GOOGLE_HOST.to_string());
        Ok(Self::new(host, api_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::executor::redact_url;

    #[test]
    fn test_query_key_hidden_from_logged_urls() {
        let config = GoogleConfig::new("https://host.example.com", "sk-gemini-secret");
        let spec = config.apply_auth(RequestSpec::post(
            "https://host.example.com/v1beta/models/m:generateContent",
        ));

        assert!(spec.url.contains("sk-gemini-secret"));
        let logged = redact_url(&spec.url);
        assert!(!logged.contains("sk-gemini-secret"), "key leaked: {logged}");
    }
}
