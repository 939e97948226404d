use std::fmt::Display;
use std::time::Duration;

use crate::errors::{Error, Result};

/// How long the executor waits on a single attempt before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
/// First backoff delay; doubles on each subsequent retry.
pub const DEFAULT_MIN_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// One field of a form-encoded or multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Bytes {
        data: Vec<u8>,
        file_name: String,
        mime_type: String,
    },
}

impl FormField {
    /// A string field. Scalars go through `Display`, which is locale-invariant
    /// in Rust; enums should pass their wire name, not their variant name.
    pub fn text<N: Into<String>, V: Display>(name: N, value: V) -> Self {
        FormField {
            name: name.into(),
            value: FormValue::Text(value.to_string()),
        }
    }

    pub fn file<N, F, M>(name: N, data: Vec<u8>, file_name: F, mime_type: M) -> Self
    where
        N: Into<String>,
        F: Into<String>,
        M: Into<String>,
    {
        FormField {
            name: name.into(),
            value: FormValue::Bytes {
                data,
                file_name: file_name.into(),
                mime_type: mime_type.into(),
            },
        }
    }
}

/// The body of an outgoing request, which fixes the content kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    FormUrlEncoded(Vec<FormField>),
    Multipart(Vec<FormField>),
}

impl RequestBody {
    /// Encode url-encoded fields to the wire string. Binary fields cannot be
    /// carried in this content kind.
    pub(crate) fn urlencode(fields: &[FormField]) -> Result<String> {
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|field| match &field.value {
                FormValue::Text(text) => Ok((field.name.as_str(), text.as_str())),
                FormValue::Bytes { .. } => Err(Error::InvalidRequest(format!(
                    "field '{}' is binary; use a multipart body",
                    field.name
                ))),
            })
            .collect::<Result<_>>()?;
        serde_urlencoded::to_string(pairs)
            .map_err(|e| Error::InvalidRequest(format!("form encoding failed: {e}")))
    }
}

/// An abstract request descriptor, built by provider code and executed by the
/// transport executor.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: String,
    pub method: Method,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    /// Total attempts made on network-class failures before raising Timeout.
    pub max_retries: u32,
    pub min_retry_delay: Duration,
}

impl RequestSpec {
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        RequestSpec {
            url: url.into(),
            method,
            body: RequestBody::Empty,
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            min_retry_delay: DEFAULT_MIN_RETRY_DELAY,
        }
    }

    pub fn get<S: Into<String>>(url: S) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post<S: Into<String>>(url: S) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::FormUrlEncoded(fields);
        self
    }

    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn min_retry_delay(mut self, delay: Duration) -> Self {
        self.min_retry_delay = delay;
        self
    }

    /// Append a query-string parameter, used for providers whose API key is
    /// placed in the query rather than a header.
    pub fn query<K: AsRef<str>, V: AsRef<str>>(mut self, key: K, value: V) -> Self {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        let pair = serde_urlencoded::to_string([(key.as_ref(), value.as_ref())])
            .unwrap_or_default();
        self.url = format!("{}{}{}", self.url, sep, pair);
        self
    }
}
