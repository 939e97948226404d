use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::base::{ChatCompletion, ChatRequest, Provider, SchemaAdapter};
use super::configs::OpenRouterConfig;
use super::openai::OpenAiAdapter;
use super::utils::{delta_from_openai, insert_opt};
use crate::errors::{Error, Result};
use crate::models::message::ChatRole;
use crate::transport::{decode_sse, ChatStream, Executor, RequestSpec};

/// Schema adapter for the aggregator dialect.
///
/// The shape is the OpenAI dialect with a wider sampling surface: the
/// aggregator forwards `top_k`, `min_p`, and `repetition_penalty` to backends
/// that honor them, so those keys are emitted here and nowhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRouterAdapter {
    inner: OpenAiAdapter,
}

impl SchemaAdapter for OpenRouterAdapter {
    fn to_wire(&self, request: &ChatRequest) -> Result<Value> {
        let mut body = match self.inner.to_wire(request)? {
            Value::Object(body) => body,
            other => return Err(Error::Parsing(format!("expected object body, got {other}"))),
        };

        let options = &request.options;
        insert_opt(&mut body, "top_k", &options.top_k);
        insert_opt(&mut body, "min_p", &options.min_p);
        insert_opt(&mut body, "repetition_penalty", &options.repetition_penalty);

        Ok(Value::Object(body))
    }

    fn from_wire(&self, response: Value) -> Result<ChatCompletion> {
        self.inner.from_wire(response)
    }

    fn role_to_wire(&self, role: ChatRole) -> &'static str {
        self.inner.role_to_wire(role)
    }

    fn role_from_wire(&self, role: &str) -> Result<ChatRole> {
        self.inner.role_from_wire(role)
    }
}

pub struct OpenRouterProvider {
    executor: Executor,
    config: OpenRouterConfig,
    adapter: OpenRouterAdapter,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Self {
        Self {
            executor: Executor::new(),
            config,
            adapter: OpenRouterAdapter::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        use super::configs::ProviderConfig;
        Ok(Self::new(OpenRouterConfig::from_env()?))
    }

    fn spec(&self, body: Value) -> RequestSpec {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        self.config
            .headers()
            .into_iter()
            .fold(RequestSpec::post(url).json(body), |spec, (k, v)| {
                spec.header(k, v)
            })
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn complete(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let request = request.clone().streaming(false);
        let body = self.adapter.to_wire(&request)?;
        let response = self.executor.execute(&self.spec(body), cancel).await?;
        if let Some(failure) = response.failure() {
            return Err(failure);
        }
        // the aggregator reports backend failures inside a 200 body
        let payload = response.json()?;
        if let Some(envelope) = payload.get("error").filter(|e| !e.is_null()) {
            let message = envelope
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown provider error");
            let code = envelope
                .get("code")
                .map(|c| c.to_string().trim_matches('"').to_string());
            return Err(Error::provider(message, code));
        }
        self.adapter.from_wire(payload)
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatStream> {
        let request = request.clone().streaming(true);
        let body = self.adapter.to_wire(&request)?;
        let bytes = self
            .executor
            .execute_stream(&self.spec(body), cancel)
            .await?;
        Ok(decode_sse(bytes, delta_from_openai, cancel.clone()))
    }
}
