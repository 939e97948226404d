use thiserror::Error;

/// Categorized failures produced by the transport and adapter layers.
///
/// Transport-level failures (`Network`, `Timeout`) are retried by the
/// executor before they surface; everything else is deterministic and is
/// raised immediately.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A well-formed error envelope returned by the vendor. The message is
    /// passed through verbatim.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        code: Option<String>,
    },

    #[error("failed to parse response: {0}")]
    Parsing(String),

    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the executor may retry after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }

    pub(crate) fn provider<S: Into<String>>(message: S, code: Option<String>) -> Self {
        Error::Provider {
            message: message.into(),
            code,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parsing(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Network("connection refused".into()).is_retryable());
        assert!(Error::Timeout("deadline elapsed".into()).is_retryable());
        assert!(!Error::InvalidRequest("bad body".into()).is_retryable());
        assert!(!Error::provider("quota exceeded", None).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_provider_message_passthrough() {
        let err = Error::provider("Rate limit reached for gpt-4o", Some("rate_limit".into()));
        assert_eq!(err.to_string(), "provider error: Rate limit reached for gpt-4o");
    }
}
