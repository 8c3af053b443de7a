//! Configuration for transcript summarization, Q&A, and analysis.
//!
//! Every knob lives in [`SummarizeConfig`], built via its
//! [`SummarizeConfigBuilder`]. The config is cheap to clone (collaborators are
//! behind `Arc`) so each concurrent chunk worker can hold its own copy.

use crate::error::PipelineError;
use crate::pipeline::tokens::{CharRatioEstimator, TokenEstimator};
use crate::progress::ProgressCallback;
use crate::provider::ModelClient;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the summarization pipeline.
///
/// Built via [`SummarizeConfig::builder()`] or using
/// [`SummarizeConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr_digest::SummarizeConfig;
///
/// let config = SummarizeConfig::builder()
///     .max_tokens(3000)
///     .concurrency(4)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummarizeConfig {
    /// Token budget per model call and for the final summary. Default: 4000.
    pub max_tokens: usize,

    /// Number of concurrent model calls within a reduction pass. Default: 10.
    ///
    /// Calls beyond the limit queue. Lower this if the provider returns 429s.
    pub concurrency: usize,

    /// Retries after the first attempt on a transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds. Default: 8000.
    pub max_backoff_ms: u64,

    /// Per-call timeout in seconds; expiry counts as a transient failure. Default: 60.
    pub api_timeout_secs: u64,

    /// Maximum number of reduction passes. Default: 5.
    ///
    /// When the merged summary still exceeds the budget after this many
    /// passes it is returned flagged `over_budget` instead of looping.
    pub max_depth: u32,

    /// Sampling temperature forwarded to the provider. Default: 0.2.
    pub temperature: f32,

    /// Completion cap per model call. Default: 1000.
    pub max_output_tokens: usize,

    /// Prior chat turns forwarded when answering a question. Default: 10.
    pub history_limit: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed model collaborator. Takes precedence over everything else.
    pub model_client: Option<Arc<dyn ModelClient>>,

    /// Pre-constructed edgequake LLM provider. Wrapped in an
    /// [`crate::provider::LlmModelClient`] at resolution time.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Token estimator shared by the chunker and the budget checks.
    pub estimator: Arc<dyn TokenEstimator>,

    /// Summary instructions override. If None, uses the built-in default.
    pub summary_instructions: Option<String>,

    /// Analysis instructions override.
    pub analysis_instructions: Option<String>,

    /// Chat system prompt override; may contain a `{CONTEXT}` placeholder.
    pub chat_instructions: Option<String>,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            concurrency: 10,
            max_retries: 3,
            retry_backoff_ms: 500,
            max_backoff_ms: 8000,
            api_timeout_secs: 60,
            max_depth: 5,
            temperature: 0.2,
            max_output_tokens: 1000,
            history_limit: 10,
            model: None,
            provider_name: None,
            model_client: None,
            provider: None,
            estimator: Arc::new(CharRatioEstimator::default()),
            summary_instructions: None,
            analysis_instructions: None,
            chat_instructions: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummarizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizeConfig")
            .field("max_tokens", &self.max_tokens)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_depth", &self.max_depth)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "model_client",
                &self.model_client.as_ref().map(|_| "<dyn ModelClient>"),
            )
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("estimator", &self.estimator)
            .finish()
    }
}

impl SummarizeConfig {
    /// Create a new builder for `SummarizeConfig`.
    pub fn builder() -> SummarizeConfigBuilder {
        SummarizeConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based): `retry_backoff_ms *
    /// 2^(attempt-1)`, capped at `max_backoff_ms`. A server-supplied
    /// `retry_after_secs` raises the delay up to the same cap.
    pub fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let base = self.retry_backoff_ms.saturating_mul(1u64 << exp);
        let hinted = retry_after_secs.map_or(0, |s| s.saturating_mul(1000));
        Duration::from_millis(base.max(hinted).min(self.max_backoff_ms))
    }
}

/// Builder for [`SummarizeConfig`].
pub struct SummarizeConfigBuilder {
    config: SummarizeConfig,
}

impl fmt::Debug for SummarizeConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizeConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SummarizeConfigBuilder {
    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_backoff_ms(mut self, ms: u64) -> Self {
        self.config.max_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn history_limit(mut self, n: usize) -> Self {
        self.config.history_limit = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.config.estimator = estimator;
        self
    }

    pub fn summary_instructions(mut self, prompt: impl Into<String>) -> Self {
        self.config.summary_instructions = Some(prompt.into());
        self
    }

    pub fn analysis_instructions(mut self, prompt: impl Into<String>) -> Self {
        self.config.analysis_instructions = Some(prompt.into());
        self
    }

    pub fn chat_instructions(mut self, prompt: impl Into<String>) -> Self {
        self.config.chat_instructions = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummarizeConfig, PipelineError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_depth == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_depth must be ≥ 1".into(),
            ));
        }
        if c.max_backoff_ms < c.retry_backoff_ms {
            return Err(PipelineError::InvalidConfig(format!(
                "max_backoff_ms ({}) must be ≥ retry_backoff_ms ({})",
                c.max_backoff_ms, c.retry_backoff_ms
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SummarizeConfig::default();
        assert_eq!(c.max_tokens, 4000);
        assert_eq!(c.concurrency, 10);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.max_depth, 5);
        assert_eq!(c.history_limit, 10);
        assert_eq!(c.estimator.estimate("abcdefgh"), 2);
    }

    #[test]
    fn builder_clamps() {
        let c = SummarizeConfig::builder()
            .concurrency(0)
            .temperature(5.0)
            .api_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.api_timeout_secs, 1);
    }

    #[test]
    fn zero_budget_rejected() {
        let err = SummarizeConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn zero_depth_rejected() {
        assert!(SummarizeConfig::builder().max_depth(0).build().is_err());
    }

    #[test]
    fn inverted_backoff_rejected() {
        let err = SummarizeConfig::builder()
            .retry_backoff_ms(1000)
            .max_backoff_ms(10)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_backoff_ms"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let c = SummarizeConfig::default();
        assert_eq!(c.backoff(1, None), Duration::from_millis(500));
        assert_eq!(c.backoff(2, None), Duration::from_millis(1000));
        assert_eq!(c.backoff(3, None), Duration::from_millis(2000));
        assert_eq!(c.backoff(10, None), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_honours_retry_after_within_cap() {
        let c = SummarizeConfig::default();
        assert_eq!(c.backoff(1, Some(3)), Duration::from_millis(3000));
        assert_eq!(c.backoff(1, Some(60)), Duration::from_millis(8000));
    }

    #[test]
    fn debug_hides_trait_objects() {
        let dbg = format!("{:?}", SummarizeConfig::default());
        assert!(dbg.contains("max_tokens"));
        assert!(!dbg.contains("progress_callback"));
    }
}
