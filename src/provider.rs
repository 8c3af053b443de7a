//! Model-call collaborator: the narrow interface the pipeline talks to, and
//! its edgequake-llm backed implementation.
//!
//! The reduction, Q&A, and analysis code only ever see
//! `Arc<dyn ModelClient>`. The concrete backend is chosen once, by
//! [`resolve_model_client`], from the injected configuration.

use crate::config::SummarizeConfig;
use crate::document::{ChatRole, ChatTurn};
use crate::error::{ModelError, PipelineError};
use crate::prompts::{chat_system_prompt, DEFAULT_CHAT_INSTRUCTIONS};
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, LLMProvider, LlmError, ProviderFactory, RetryStrategy,
};
use std::sync::Arc;
use tracing::debug;

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// The two capabilities the pipeline needs from a language model.
///
/// Implementations report failures as [`ModelError`]; the pipeline decides
/// what to retry from [`ModelError::is_retryable`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Apply `instructions` to `text` (summarise, analyse, …).
    async fn summarize(&self, text: &str, instructions: &str) -> Result<String, ModelError>;

    /// Answer `question` from `context`.
    async fn answer(&self, context: &str, question: &str) -> Result<String, ModelError>;

    /// Answer with prior conversation turns. Collaborators without chat
    /// support fall back to [`ModelClient::answer`] and ignore the history.
    async fn answer_with_history(
        &self,
        context: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String, ModelError> {
        let _ = history;
        self.answer(context, question).await
    }
}

/// [`ModelClient`] over any edgequake-llm [`LLMProvider`].
pub struct LlmModelClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    chat_instructions: String,
    timeout_secs: u64,
}

impl LlmModelClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SummarizeConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            chat_instructions: config
                .chat_instructions
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_INSTRUCTIONS.to_string()),
            timeout_secs: config.api_timeout_secs,
        }
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ModelError> {
        match self.provider.chat(messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "Model call: {} input tokens, {} output tokens",
                    response.prompt_tokens, response.completion_tokens
                );
                Ok(response.content)
            }
            Err(e) => Err(classify_error(&e, self.timeout_secs)),
        }
    }
}

#[async_trait]
impl ModelClient for LlmModelClient {
    async fn summarize(&self, text: &str, instructions: &str) -> Result<String, ModelError> {
        let messages = vec![ChatMessage::system(instructions), ChatMessage::user(text)];
        self.chat(&messages).await
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String, ModelError> {
        self.answer_with_history(context, &[], question).await
    }

    async fn answer_with_history(
        &self,
        context: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String, ModelError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(chat_system_prompt(
            &self.chat_instructions,
            context,
        )));
        for turn in history {
            messages.push(match turn.role {
                ChatRole::User => ChatMessage::user(turn.content.as_str()),
                ChatRole::Assistant => ChatMessage::assistant(turn.content.as_str()),
            });
        }
        messages.push(ChatMessage::user(question));
        self.chat(&messages).await
    }
}

/// Build `CompletionOptions` from the summarize config.
fn build_options(config: &SummarizeConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    }
}

/// Map an edgequake-llm error onto the transient/permanent taxonomy.
///
/// Only throttling, timeouts, network failures and server-side errors are
/// transient. Auth, invalid requests, unknown models and context overflow are
/// permanent: resending the same request cannot succeed.
pub fn classify_error(error: &LlmError, timeout_secs: u64) -> ModelError {
    match error {
        LlmError::RateLimited(_) => ModelError::RateLimited {
            retry_after_secs: None,
        },
        LlmError::Timeout => ModelError::Timeout { secs: timeout_secs },
        LlmError::NetworkError(_) | LlmError::ProviderError(_) => {
            ModelError::Unavailable(error.to_string())
        }
        LlmError::ApiError(_) if error.retry_strategy() == RetryStrategy::server_backoff() => {
            ModelError::Unavailable(error.to_string())
        }
        _ => ModelError::Rejected(error.to_string()),
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PipelineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the model collaborator, from most-specific to least-specific:
///
/// 1. **Injected client** (`config.model_client`): used as-is; this is how
///    tests and callers with custom middleware plug in.
/// 2. **Injected provider** (`config.provider`): wrapped in [`LlmModelClient`].
/// 3. **Named provider + model** (`config.provider_name`).
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **OpenAI key** (`OPENAI_API_KEY`) with the configured or default model.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_model_client(
    config: &SummarizeConfig,
) -> Result<Arc<dyn ModelClient>, PipelineError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmModelClient::new(provider, config)))
}

fn resolve_provider(config: &SummarizeConfig) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
