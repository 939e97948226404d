use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use super::base::{ChatCompletion, ChatRequest, Provider, SchemaAdapter};
use super::configs::OllamaConfig;
use super::utils::{
    completion_from_openai, delta_from_openai, insert_opt, message_to_openai, tools_to_openai,
};
use crate::errors::{Error, Result};
use crate::models::message::ChatRole;
use crate::transport::{decode_sse, ChatStream, Executor, RequestSpec};

/// Schema adapter for a local server speaking the OpenAI-compatible dialect.
///
/// The only divergence from the hosted dialect is the role set: the local
/// server predates the `developer` role, so Developer collapses to `system`
/// on the way out. The collapse is asserted in the tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaAdapter;

impl OllamaAdapter {
    fn role_from(role: &str) -> Result<ChatRole> {
        match role {
            "system" => Ok(ChatRole::System),
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "tool" => Ok(ChatRole::Tool),
            other => Err(Error::Parsing(format!("unrecognized role '{other}'"))),
        }
    }
}

impl SchemaAdapter for OllamaAdapter {
    fn to_wire(&self, request: &ChatRequest) -> Result<Value> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|message| message_to_openai(message, self.role_to_wire(message.role)))
            .collect::<Result<_>>()?;

        let mut body = Map::new();
        body.insert("model".to_string(), json!(request.model));
        body.insert("messages".to_string(), json!(messages));
        if request.stream {
            body.insert("stream".to_string(), json!(true));
        }

        let options = &request.options;
        insert_opt(&mut body, "temperature", &options.temperature);
        insert_opt(&mut body, "top_p", &options.top_p);
        insert_opt(&mut body, "max_tokens", &options.max_tokens);
        insert_opt(&mut body, "stop", &options.stop);
        insert_opt(&mut body, "seed", &options.seed);

        if !request.tools.is_empty() {
            body.insert("tools".to_string(), json!(tools_to_openai(&request.tools)?));
        }

        Ok(Value::Object(body))
    }

    fn from_wire(&self, response: Value) -> Result<ChatCompletion> {
        completion_from_openai(&response, Self::role_from)
    }

    fn role_to_wire(&self, role: ChatRole) -> &'static str {
        match role {
            // the local server has no developer role
            ChatRole::System | ChatRole::Developer => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }

    fn role_from_wire(&self, role: &str) -> Result<ChatRole> {
        Self::role_from(role)
    }
}

pub struct OllamaProvider {
    executor: Executor,
    config: OllamaConfig,
    adapter: OllamaAdapter,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            executor: Executor::new(),
            config,
            adapter: OllamaAdapter,
        }
    }

    pub fn from_env() -> Result<Self> {
        use super::configs::ProviderConfig;
        Ok(Self::new(OllamaConfig::from_env()?))
    }

    /// No credentials; a bare host (even "localhost") is normalized to a
    /// usable base URL.
    fn spec(&self, body: Value) -> RequestSpec {
        let mut host = self.config.host.trim_end_matches('/').to_string();
        if !host.starts_with("http://") && !host.starts_with("https://") {
            host = format!("http://{host}");
        }
        RequestSpec::post(format!("{host}/v1/chat/completions")).json(body)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
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
        self.adapter.from_wire(response.json()?)
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
