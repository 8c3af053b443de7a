//! Depth-bounded map-reduce summarization.
//!
//! ```text
//! text ──▶ split ──┬─ 1 chunk that fits ──▶ summarise ──▶ leaf (depth d)
//!                  │
//!                  └─ N chunks ──▶ summarise ×N (concurrent, bounded)
//!                                   │ reassemble by chunk index
//!                                   ▼
//!                               join "\n\n" ──▶ fits? ──▶ node (depth d+1)
//!                                                 │ no
//!                                                 ▼
//!                                  d+1 < max_depth? ──▶ next pass on candidate
//!                                                 │ no
//!                                                 ▼
//!                                       node flagged over_budget
//! ```
//!
//! Each pass is a fan-out over the chunks with at most `concurrency` model
//! calls in flight, and a fan-in into a slot vector indexed by chunk index.
//! The first permanent failure returns immediately; dropping the stream
//! cancels every sibling call still in flight, and the partial slots are
//! discarded with it.

use crate::config::SummarizeConfig;
use crate::document::{Chunk, SummaryNode};
use crate::error::PipelineError;
use crate::pipeline::chunker::Chunker;
use crate::pipeline::llm::summarize_chunk;
use crate::provider::ModelClient;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Separator placed between per-chunk summaries.
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Drives reduction passes over a model collaborator.
pub struct Summarizer {
    model: Arc<dyn ModelClient>,
    chunker: Chunker,
    config: SummarizeConfig,
}

impl Summarizer {
    /// `config` need not come from the builder: a zero `concurrency` or
    /// `max_depth` is raised to 1 here.
    pub fn new(model: Arc<dyn ModelClient>, mut config: SummarizeConfig) -> Self {
        config.concurrency = config.concurrency.max(1);
        config.max_depth = config.max_depth.max(1);
        let chunker = Chunker::new(Arc::clone(&config.estimator));
        Self {
            model,
            chunker,
            config,
        }
    }

    pub fn config(&self) -> &SummarizeConfig {
        &self.config
    }

    /// Reduce `text` to a summary of at most `max_tokens` estimated tokens.
    ///
    /// Returns a node flagged `over_budget` when the depth ceiling is reached,
    /// or when a single fitting chunk came back from the model too long.
    /// Empty input yields an empty depth-0 node without calling the model.
    ///
    /// # Errors
    /// [`PipelineError::InvalidConfig`] for a zero budget, which no summary
    /// could ever meet.
    pub async fn summarize(
        &self,
        text: &str,
        max_tokens: usize,
    ) -> Result<SummaryNode, PipelineError> {
        if max_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        let mut current = text.to_string();
        let mut depth = 0u32;

        loop {
            let chunks = self.chunker.split(&current, max_tokens);
            if chunks.is_empty() {
                return Ok(self.node(String::new(), depth, max_tokens));
            }

            if let [only] = chunks.as_slice() {
                if !only.oversized {
                    debug!("Pass {}: single chunk of {} tokens", depth, only.estimated_tokens);
                    let summary =
                        summarize_chunk(self.model.as_ref(), only, depth, 1, &self.config).await?;
                    return Ok(self.node(summary, depth, max_tokens));
                }
            }

            let candidate = self.reduction_pass(&chunks, depth).await?.join(SUMMARY_SEPARATOR);
            depth += 1;
            let node = self.node(candidate, depth, max_tokens);

            if let Some(ref cb) = self.config.progress_callback {
                cb.on_pass_complete(depth - 1, node.estimated_tokens, !node.over_budget);
            }

            if !node.over_budget {
                info!(
                    "Summary fits: {} tokens at depth {} (budget {})",
                    node.estimated_tokens, depth, max_tokens
                );
                return Ok(node);
            }
            if depth >= self.config.max_depth {
                warn!(
                    "Depth ceiling {} reached; returning {}-token summary over the {}-token budget",
                    self.config.max_depth, node.estimated_tokens, max_tokens
                );
                return Ok(node);
            }

            info!(
                "Merged summary is {} tokens (budget {}); starting pass {}",
                node.estimated_tokens, max_tokens, depth
            );
            current = node.text;
        }
    }

    /// Summarise every chunk concurrently; results are in chunk order.
    async fn reduction_pass(
        &self,
        chunks: &[Chunk],
        depth: u32,
    ) -> Result<Vec<String>, PipelineError> {
        let total = chunks.len();
        info!(
            "Pass {}: summarising {} chunks ({} in flight)",
            depth, total, self.config.concurrency
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_pass_start(depth, total);
        }

        let mut slots: Vec<Option<String>> = vec![None; total];
        let mut in_flight = stream::iter(chunks.iter().map(|chunk| async move {
            let summary =
                summarize_chunk(self.model.as_ref(), chunk, depth, total, &self.config).await;
            (chunk.index, summary)
        }))
        .buffer_unordered(self.config.concurrency);

        while let Some((index, summary)) = in_flight.next().await {
            slots[index] = Some(summary?);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    PipelineError::Internal(format!("pass {depth}: chunk {index} produced no result"))
                })
            })
            .collect()
    }

    fn node(&self, text: String, depth: u32, max_tokens: usize) -> SummaryNode {
        let estimated_tokens = self.config.estimator.estimate(&text);
        SummaryNode {
            text,
            estimated_tokens,
            depth,
            over_budget: estimated_tokens > max_tokens,
        }
    }
}
