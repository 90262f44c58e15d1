pub mod queue;
pub mod scripted;

#[cfg(test)]
mod queue_tests;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{LlmRuntimeConfig, LlmSettings};
use crate::constants;
use crate::error::{is_rate_limit_error, LlmError};

pub use queue::{LlmQueue, Priority};
pub use scripted::ScriptedModel;

/// One system + user exchange issued by an agent
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub agent: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub priority: Priority,
}

impl ChatRequest {
    pub fn new(
        agent: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            agent: agent.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            priority,
        }
    }
}

/// Anything that can answer a chat completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

/// Pass-through client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl LlmClient {
    pub fn new(settings: &LlmSettings, runtime: &LlmRuntimeConfig) -> Result<Self, LlmError> {
        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.base_url.clone());

        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        let client = Client::with_config(config).with_http_client(http);

        info!(
            "🤖 [LLM] Client ready (provider: {}, model: {}, timeout: {}s)",
            settings.provider,
            settings.model,
            settings.timeout.as_secs()
        );

        Ok(Self {
            client,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: settings.timeout,
            max_retries: runtime.max_retries,
            retry_base_delay: Duration::from_millis(runtime.retry_base_delay_ms),
        })
    }

    /// Single attempt: system + user message, first choice's text
    #[allow(deprecated)]
    pub async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_prompt)
                        .build()?,
                ),
            ])
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::EmptyResponse {
                model: self.model.clone(),
            })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.retry_base_delay.saturating_mul(factor);
        delay.min(Duration::from_millis(constants::llm::RETRY_MAX_DELAY_MS))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.chat(&request.system_prompt, &request.user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    let message = e.to_string();
                    warn!(
                        event = constants::events::LLM_RETRY,
                        agent = %request.agent,
                        attempt,
                        rate_limited = is_rate_limit_error(&message),
                        "⚠️ [LLM] {} failed: {}. Retrying in {}ms",
                        request.agent,
                        message,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retryable(error: &LlmError) -> bool {
    !matches!(error, LlmError::QueueClosed | LlmError::Cancelled)
}
