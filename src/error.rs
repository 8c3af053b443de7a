//! Error types for the ocr-digest library.
//!
//! Three error types reflect three distinct failure sources:
//!
//! * [`PipelineError`]: **fatal**, the operation cannot produce a result
//!   (no usable fragments, a chunk failed permanently, provider not
//!   configured). Returned as `Err(PipelineError)` from the entry points in
//!   [`crate::process`].
//!
//! * [`ModelError`]: a single model call failed. Transient variants are
//!   retried by the pipeline and never surface on their own; a permanent one
//!   (or exhausted retries) is wrapped into
//!   [`PipelineError::SummarizationFailed`] with the failing chunk index.
//!
//! * [`OcrError`]: the OCR collaborator could not produce fragments.

use thiserror::Error;

/// All fatal errors returned by the ocr-digest library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No fragment survived across all pages; usually an upstream OCR failure.
    #[error("Transcript is empty: OCR produced no usable text fragments")]
    EmptyTranscript,

    /// Every fragment on a page had a malformed bounding box.
    #[error("Page {page}: all {dropped} fragments had malformed bounding boxes")]
    MalformedPage { page: u32, dropped: usize },

    /// The OCR response body could not be parsed.
    #[error("Invalid OCR response: {0}")]
    InvalidOcrResponse(String),

    /// The OCR collaborator failed.
    #[error(transparent)]
    Ocr(#[from] OcrError),

    // ── Model errors ──────────────────────────────────────────────────────
    /// A chunk failed permanently; the whole reduction pass was abandoned.
    #[error("Summarization failed on chunk {chunk_index} (pass depth {depth}) after {attempts} attempt(s): {source}")]
    SummarizationFailed {
        chunk_index: usize,
        depth: u32,
        attempts: u32,
        #[source]
        source: ModelError,
    },

    /// The question-answering call failed permanently.
    #[error("Answer failed after {attempts} attempt(s): {source}")]
    AnswerFailed {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    /// The document-analysis call failed permanently.
    #[error("Analysis failed after {attempts} attempt(s): {source}")]
    AnalysisFailed {
        attempts: u32,
        #[source]
        source: ModelError,
    },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single call to the model collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ModelError {
    /// The call did not complete within the configured timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Provider returned HTTP 429 or an equivalent throttle signal.
    #[error("model rate limited{}", retry_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// 5xx-equivalent: provider overloaded, network blip, connection reset.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// Permanent rejection (content policy, bad request, auth).
    #[error("model rejected the request: {0}")]
    Rejected(String),
}

impl ModelError {
    /// `true` for failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ModelError::Rejected(_))
    }
}

fn retry_suffix(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|s| format!(" (retry after {s}s)"))
        .unwrap_or_default()
}

/// Failure of the OCR collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR backend unavailable: {0}")]
    Unavailable(String),

    #[error("OCR timed out after {secs}s")]
    Timeout { secs: u64 },
}
