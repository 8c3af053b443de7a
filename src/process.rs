//! Document-level entry points.
//!
//! Each function resolves the model collaborator once from the config, then
//! drives the pipeline stages in [`crate::pipeline`]. Fatal failures come back
//! as [`PipelineError`]; everything recoverable (dropped fragments, oversized
//! paragraphs, depth-ceiling exhaustion, unparseable analysis) is reported in
//! the returned value instead.

use crate::config::SummarizeConfig;
use crate::document::{ChatTurn, DocumentAnalysis, SummaryNode, TextFragment, Transcript};
use crate::error::PipelineError;
use crate::pipeline::llm::{call_with_retry, CallFailure};
use crate::pipeline::postprocess::extract_json;
use crate::pipeline::reduce::Summarizer;
use crate::pipeline::transcript::assemble;
use crate::prompts::DEFAULT_ANALYSIS_INSTRUCTIONS;
use crate::provider::{resolve_model_client, ModelClient};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use crate::pipeline::ocr::transcribe;

/// Order OCR fragments and assemble them into a [`Transcript`].
///
/// # Errors
/// - [`PipelineError::EmptyTranscript`] when no fragment survives
/// - [`PipelineError::MalformedPage`] when every fragment of a page is malformed
pub fn build_transcript(
    fragments: impl IntoIterator<Item = TextFragment>,
) -> Result<Transcript, PipelineError> {
    let transcript = assemble(fragments)?;
    info!(
        "Transcript: {} pages, {} fragments ({} dropped), mean confidence {:.1}",
        transcript.page_count(),
        transcript.fragment_count(),
        transcript.dropped_fragments,
        transcript.mean_confidence
    );
    Ok(transcript)
}

/// Summarise a transcript to at most `max_tokens` estimated tokens.
///
/// The result is flagged `over_budget` when `config.max_depth` passes were
/// not enough; that is not an error.
///
/// # Errors
/// [`PipelineError::SummarizationFailed`] with the failing chunk index when a
/// model call fails permanently; no partial summary is returned.
pub async fn summarize_transcript(
    transcript: &Transcript,
    max_tokens: usize,
    config: &SummarizeConfig,
) -> Result<SummaryNode, PipelineError> {
    summarize_text(&transcript.full_text, max_tokens, config).await
}

/// [`summarize_transcript`] over raw text.
///
/// # Errors
/// [`PipelineError::InvalidConfig`] when `max_tokens` is zero, checked before
/// any provider is resolved.
pub async fn summarize_text(
    text: &str,
    max_tokens: usize,
    config: &SummarizeConfig,
) -> Result<SummaryNode, PipelineError> {
    if max_tokens == 0 {
        return Err(PipelineError::InvalidConfig(
            "max_tokens must be ≥ 1".into(),
        ));
    }
    let start = Instant::now();
    let model = resolve_model_client(config)?;
    let node = Summarizer::new(model, config.clone())
        .summarize(text, max_tokens)
        .await?;
    info!(
        "Summary complete: {} tokens, depth {}, over budget: {}, {:?}",
        node.estimated_tokens,
        node.depth,
        node.over_budget,
        start.elapsed()
    );
    Ok(node)
}

/// Answer `question` about a document.
///
/// A context larger than `config.max_tokens` is first reduced to half the
/// budget, leaving room for the question and history. Only the last
/// `config.history_limit` turns are forwarded.
///
/// # Errors
/// [`PipelineError::AnswerFailed`] when the answer call fails permanently, or
/// [`PipelineError::SummarizationFailed`] if reducing the context fails.
pub async fn answer_question(
    context: &str,
    question: &str,
    history: &[ChatTurn],
    config: &SummarizeConfig,
) -> Result<String, PipelineError> {
    let model = resolve_model_client(config)?;
    let context = fit_context(&model, context, config.max_tokens / 2, config).await?;
    let recent = &history[history.len().saturating_sub(config.history_limit)..];
    debug!(
        "Answering with {} context tokens and {} history turns",
        config.estimator.estimate(&context),
        recent.len()
    );

    let answer = call_with_retry(
        config,
        "Answer",
        |_, _| {},
        || model.answer_with_history(&context, recent, question),
    )
    .await
    .map_err(|CallFailure { error, attempts }| PipelineError::AnswerFailed {
        attempts,
        source: error,
    })?;

    Ok(answer.trim().to_string())
}

/// Classify a document and extract its key entities.
///
/// Model output that is not a JSON object yields
/// [`DocumentAnalysis`] with `error` set rather than an `Err`.
///
/// # Errors
/// [`PipelineError::AnalysisFailed`] when the model call fails permanently.
pub async fn analyze_transcript(
    transcript: &Transcript,
    config: &SummarizeConfig,
) -> Result<DocumentAnalysis, PipelineError> {
    let model = resolve_model_client(config)?;
    let context = fit_context(&model, &transcript.full_text, config.max_tokens, config).await?;
    let instructions = config
        .analysis_instructions
        .as_deref()
        .unwrap_or(DEFAULT_ANALYSIS_INSTRUCTIONS);

    let raw = call_with_retry(
        config,
        "Analysis",
        |_, _| {},
        || model.summarize(&context, instructions),
    )
    .await
    .map_err(|CallFailure { error, attempts }| PipelineError::AnalysisFailed {
        attempts,
        source: error,
    })?;

    Ok(parse_analysis(&raw))
}

fn parse_analysis(raw: &str) -> DocumentAnalysis {
    match serde_json::from_str::<DocumentAnalysis>(extract_json(raw)) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("Analysis response is not valid JSON: {}", e);
            DocumentAnalysis::unparseable(e.to_string())
        }
    }
}

/// Return `text` unchanged if it fits `budget`, else its reduced summary.
async fn fit_context(
    model: &Arc<dyn ModelClient>,
    text: &str,
    budget: usize,
    config: &SummarizeConfig,
) -> Result<String, PipelineError> {
    let tokens = config.estimator.estimate(text);
    if tokens <= budget {
        return Ok(text.to_string());
    }
    info!("Context is {} tokens; reducing to {}", tokens, budget);
    let node = Summarizer::new(Arc::clone(model), config.clone())
        .summarize(text, budget.max(1))
        .await?;
    Ok(node.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentCategory;

    #[test]
    fn parse_fenced_analysis() {
        let raw = "```json\n{\"category\": \"receipt\", \"confidence\": 0.9, \"suggested_tags\": [\"food\"]}\n```";
        let a = parse_analysis(raw);
        assert_eq!(a.category, DocumentCategory::Receipt);
        assert_eq!(a.suggested_tags, vec!["food"]);
        assert!(a.error.is_none());
    }

    #[test]
    fn parse_analysis_with_surrounding_prose() {
        let raw = "Here is the analysis: {\"category\": \"letter\", \"confidence\": 0.8} Hope it helps.";
        assert_eq!(parse_analysis(raw).category, DocumentCategory::Letter);
    }

    #[test]
    fn unparseable_analysis_falls_back() {
        let a = parse_analysis("I cannot determine the category.");
        assert_eq!(a.category, DocumentCategory::Other);
        assert_eq!(a.confidence, 0.0);
        assert!(a.error.is_some());
    }

    #[tokio::test]
    async fn zero_budget_fails_before_provider_resolution() {
        // No client is injected, so reaching resolution would need a provider.
        let config = SummarizeConfig::builder()
            .provider_name("definitely-not-a-provider")
            .build()
            .unwrap();
        let err = summarize_text("alpha beta\n\ngamma", 0, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn build_transcript_rejects_empty() {
        let err = build_transcript(Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTranscript));
    }
}
