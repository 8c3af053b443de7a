//! Model interaction: one chunk in, one cleaned summary out.
//!
//! All prompt text lives in [`crate::prompts`]; this module owns the retry
//! and timeout policy around a single collaborator call.
//!
//! ## Retry Strategy
//!
//! Timeouts, 429s and 5xx-equivalents are transient under concurrent load.
//! Exponential backoff (`retry_backoff_ms * 2^(attempt-1)`, capped at
//! `max_backoff_ms`) spaces the retries out: with the defaults the waits are
//! 500 ms → 1 s → 2 s. A permanent rejection is never retried.

use crate::config::SummarizeConfig;
use crate::document::Chunk;
use crate::error::{ModelError, PipelineError};
use crate::pipeline::postprocess::clean_summary;
use crate::prompts::DEFAULT_SUMMARY_INSTRUCTIONS;
use crate::provider::ModelClient;
use std::future::Future;
use std::time::Instant;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// A call that failed permanently or ran out of retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub error: ModelError,
    /// Total attempts made, including the first.
    pub attempts: u32,
}

/// Run `call` with the configured timeout, retrying transient failures.
///
/// `on_retry(attempt, error)` is invoked before each backoff sleep, with the
/// 1-based number of the attempt that just failed.
pub async fn call_with_retry<F, Fut>(
    config: &SummarizeConfig,
    label: &str,
    mut on_retry: impl FnMut(u32, &ModelError),
    mut call: F,
) -> Result<String, CallFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ModelError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let error = match timeout(config.api_timeout(), call()).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => e,
            Err(_) => ModelError::Timeout {
                secs: config.api_timeout_secs,
            },
        };

        if !error.is_retryable() || attempt > config.max_retries {
            warn!("{}: giving up after {} attempt(s): {}", label, attempt, error);
            return Err(CallFailure { error, attempts: attempt });
        }

        let retry_after = match error {
            ModelError::RateLimited { retry_after_secs } => retry_after_secs,
            _ => None,
        };
        let backoff = config.backoff(attempt, retry_after);
        warn!(
            "{}: attempt {} failed ({}); retry {}/{} after {}ms",
            label,
            attempt,
            error,
            attempt,
            config.max_retries,
            backoff.as_millis()
        );
        on_retry(attempt, &error);
        sleep(backoff).await;
    }
}

/// Summarise one chunk of reduction pass `depth`.
///
/// Returns the cleaned summary, or [`PipelineError::SummarizationFailed`]
/// carrying the chunk index when the call fails permanently.
pub async fn summarize_chunk(
    model: &dyn ModelClient,
    chunk: &Chunk,
    depth: u32,
    total: usize,
    config: &SummarizeConfig,
) -> Result<String, PipelineError> {
    let start = Instant::now();
    let instructions = config
        .summary_instructions
        .as_deref()
        .unwrap_or(DEFAULT_SUMMARY_INSTRUCTIONS);
    let text = chunk.text.trim();
    let label = format!("Pass {depth} chunk {}/{total}", chunk.index + 1);

    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_start(depth, chunk.index, total);
    }

    let result = call_with_retry(
        config,
        &label,
        |attempt, error| {
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_retry(depth, chunk.index, attempt, &error.to_string());
            }
        },
        || model.summarize(text, instructions),
    )
    .await;

    match result {
        Ok(raw) => {
            let summary = clean_summary(&raw);
            debug!(
                "{}: {} tokens in, {} chars out, {:?}",
                label,
                chunk.estimated_tokens,
                summary.len(),
                start.elapsed()
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_complete(depth, chunk.index, total, summary.len());
            }
            Ok(summary)
        }
        Err(CallFailure { error, attempts }) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_chunk_error(depth, chunk.index, total, &error.to_string());
            }
            Err(PipelineError::SummarizationFailed {
                chunk_index: chunk.index,
                depth,
                attempts,
                source: error,
            })
        }
    }
}
