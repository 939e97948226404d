use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::request::{FormValue, Method, RequestBody, RequestSpec};
use crate::errors::{Error, Result};

/// Header names whose values never reach the logs.
const SECRET_HEADERS: [&str; 4] = ["authorization", "x-api-key", "xi-api-key", "x-goog-api-key"];

/// Query parameter names whose values never reach the logs; some providers
/// place the API key in the query string rather than a header.
const SECRET_QUERY_PARAMS: [&str; 2] = ["key", "api_key"];

/// The response to a completed transport exchange. Any status is carried
/// here, including 4xx/5xx; interpreting the body is the caller's job.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::Parsing(format!("response body is not valid JSON: {e}")))
    }

    /// Categorize a non-2xx response: 401/403 become authentication failures,
    /// a well-formed `error` envelope becomes a provider error with the
    /// vendor's message verbatim, anything else falls back on the status.
    pub fn failure(&self) -> Option<Error> {
        if self.is_success() {
            return None;
        }
        let envelope = self
            .json()
            .ok()
            .and_then(|v| v.get("error").cloned())
            .map(|e| {
                let message = e
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string());
                let code = e
                    .get("code")
                    .or_else(|| e.get("type"))
                    .and_then(|c| c.as_str())
                    .map(str::to_string);
                (message, code)
            });

        Some(match (self.status, envelope) {
            (401 | 403, Some((message, _))) => Error::AuthenticationFailed(message),
            (401 | 403, None) => Error::AuthenticationFailed(format!("HTTP {}", self.status)),
            (_, Some((message, code))) => Error::provider(message, code),
            (status, None) if (400..500).contains(&status) => {
                Error::InvalidRequest(format!("HTTP {}: {}", status, self.text()))
            }
            (status, None) => Error::provider(format!("HTTP {}: {}", status, self.text()), None),
        })
    }
}

/// Performs network exchanges for request descriptors, with retry, backoff,
/// and cancellation. Holds only a connection pool; no per-request state.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    client: Client,
}

impl Executor {
    pub fn new() -> Self {
        Executor {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Executor { client }
    }

    /// Execute the request, retrying network-class failures with exponential
    /// backoff. A response with any HTTP status is a success at this level.
    /// Cancellation aborts immediately, including mid-backoff.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        let response = self
            .with_retries(spec, cancel, |request| async {
                let response = request.send().await?;
                let status = response.status().as_u16();
                let headers = response.headers().clone();
                let body = response.bytes().await?.to_vec();
                Ok(TransportResponse {
                    status,
                    headers,
                    body,
                })
            })
            .await?;

        debug!(url = %redact_url(&spec.url), status = response.status, "transport exchange complete");
        Ok(response)
    }

    /// Execute a streaming request. On a 2xx status the raw byte stream is
    /// handed back for the decoder; a non-2xx handshake is read fully and
    /// categorized, so a stream that was never established fails before any
    /// delta is produced.
    pub async fn execute_stream(
        &self,
        spec: &RequestSpec,
        cancel: &CancellationToken,
    ) -> Result<impl Stream<Item = reqwest::Result<Vec<u8>>>> {
        let response = self
            .with_retries(spec, cancel, |request| async {
                let response = request
                    .header("Accept", "text/event-stream")
                    .header("Cache-Control", "no-cache")
                    .send()
                    .await?;
                Ok(response)
            })
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();
            let failed = TransportResponse {
                status,
                headers,
                body,
            };
            return Err(failed
                .failure()
                .unwrap_or_else(|| Error::Network(format!("HTTP {status}"))));
        }

        debug!(url = %redact_url(&spec.url), "stream established");
        Ok(response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())))
    }

    async fn with_retries<T, F, Fut>(
        &self,
        spec: &RequestSpec,
        cancel: &CancellationToken,
        send: F,
    ) -> Result<T>
    where
        F: Fn(reqwest::RequestBuilder) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = spec.max_retries.max(1);
        let mut delay = spec.min_retry_delay;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            debug!(
                url = %redact_url(&spec.url),
                attempt,
                headers = ?redact_headers(&spec.headers),
                "sending request"
            );

            let request = self.build(spec)?;
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = send(request) => result,
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(url = %redact_url(&spec.url), attempt, error = %err, "transport error, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay *= 2;
                }
                Err(err) if err.is_retryable() => {
                    return Err(Error::Timeout(format!(
                        "request failed after {max_attempts} attempts: {err}"
                    )));
                }
                Err(err) => return Err(err),
            }
        }

        Err(Error::Timeout(format!(
            "request failed after {max_attempts} attempts"
        )))
    }

    fn build(&self, spec: &RequestSpec) -> Result<reqwest::RequestBuilder> {
        // Reject a malformed URL up front so it surfaces as a request defect
        // rather than a retryable network failure
        let url = url::Url::parse(&spec.url)
            .map_err(|e| Error::InvalidRequest(format!("invalid url '{}': {e}", spec.url)))?;

        let mut request = match spec.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        }
        .timeout(spec.timeout);

        for (key, value) in &spec.headers {
            request = request.header(key, value);
        }

        request = match &spec.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::FormUrlEncoded(fields) => request
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(RequestBody::urlencode(fields)?),
            RequestBody::Multipart(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for field in fields {
                    form = match &field.value {
                        FormValue::Text(text) => form.text(field.name.clone(), text.clone()),
                        FormValue::Bytes {
                            data,
                            file_name,
                            mime_type,
                        } => {
                            let part = reqwest::multipart::Part::bytes(data.clone())
                                .file_name(file_name.clone())
                                .mime_str(mime_type)
                                .map_err(|e| {
                                    Error::InvalidRequest(format!(
                                        "invalid mime type '{mime_type}': {e}"
                                    ))
                                })?;
                            form.part(field.name.clone(), part)
                        }
                    };
                }
                request.multipart(form)
            }
        };

        Ok(request)
    }
}

/// Mask secret-bearing query parameter values before a URL is logged.
pub(crate) fn redact_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    if url.query().is_none() {
        return raw.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if SECRET_QUERY_PARAMS.contains(&key.to_lowercase().as_str()) {
                (key.into_owned(), "redacted".to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(key, value)| {
            if SECRET_HEADERS.contains(&key.to_lowercase().as_str()) {
                (key.clone(), "<redacted>".to_string())
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}
