use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::executor::{redact_url, Executor};
use super::request::RequestSpec;
use crate::errors::{Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how often to poll an asynchronous provider job.
#[derive(Debug, Clone)]
pub struct PollSpec {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSpec {
    pub fn new<S: Into<String>>(url: S) -> Self {
        PollSpec {
            url: url.into(),
            headers: Vec::new(),
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Repeatedly GET a status URL until the predicate holds, the body carries an
/// `error` field (raised immediately), or the time budget is spent.
///
/// The wait between polls is cancellable, and each poll reports elapsed time
/// to the optional progress callback.
pub async fn poll_until<P>(
    executor: &Executor,
    spec: &PollSpec,
    predicate: P,
    progress: Option<&(dyn Fn(Duration) + Send + Sync)>,
    cancel: &CancellationToken,
) -> Result<serde_json::Value>
where
    P: Fn(&serde_json::Value) -> bool,
{
    let started = Instant::now();

    loop {
        let request = spec
            .headers
            .iter()
            .fold(RequestSpec::get(&spec.url), |req, (k, v)| {
                req.header(k.clone(), v.clone())
            });

        let response = executor.execute(&request, cancel).await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }
        let status = response.json()?;

        if let Some(envelope) = status.get("error").filter(|e| !e.is_null()) {
            let message = envelope
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| envelope.to_string());
            return Err(Error::provider(message, None));
        }

        let elapsed = started.elapsed();
        if let Some(report) = progress {
            report(elapsed);
        }

        if predicate(&status) {
            debug!(url = %redact_url(&spec.url), ?elapsed, "poll predicate satisfied");
            return Ok(status);
        }

        if elapsed + spec.interval > spec.timeout {
            return Err(Error::Timeout(format!(
                "operation still pending after {elapsed:?}"
            )));
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(spec.interval) => {}
        }
    }
}
