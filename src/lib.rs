//! # ocr-digest
//!
//! Turn raw OCR fragments into an ordered transcript, then summarise it to a
//! fixed token budget with a language model.
//!
//! ## Why this crate?
//!
//! OCR engines such as AWS Textract return lines in detection order, not
//! reading order, and a long scanned document rarely fits in one model call.
//! This crate sorts fragments by quantised row then column, assembles a
//! per-page transcript, and reduces it with a concurrent, depth-bounded
//! map-reduce that always terminates.
//!
//! ## Pipeline Overview
//!
//! ```text
//! OCR fragments
//!  │
//!  ├─ 1. Order      row-quantised (top×100) then left, per page
//!  ├─ 2. Assemble   drop malformed boxes, join lines and pages
//!  ├─ 3. Chunk      greedy paragraph packing under the token budget
//!  ├─ 4. Summarise  concurrent model calls with retry/backoff
//!  └─ 5. Reduce     merge, re-check budget, repeat up to max_depth
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_digest::{build_transcript, summarize_transcript, SummarizeConfig, TextFragment};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transcript = build_transcript(vec![
//!         TextFragment::new("Total: $50", 0.40, 0.1, 1),
//!         TextFragment::new("INVOICE", 0.05, 0.4, 1),
//!     ])?;
//!
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = SummarizeConfig::default();
//!     let summary = summarize_transcript(&transcript, config.max_tokens, &config).await?;
//!     println!("{} (depth {})", summary.text, summary.depth);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-digest` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod provider;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SummarizeConfig, SummarizeConfigBuilder};
pub use document::{
    ChatRole, ChatTurn, Chunk, DocumentAnalysis, DocumentCategory, Page, SummaryNode,
    TextFragment, Transcript,
};
pub use error::{ModelError, OcrError, PipelineError};
pub use pipeline::chunker::Chunker;
pub use pipeline::geometry::sort_reading_order;
pub use pipeline::ocr::{parse_textract_response, OcrEngine};
pub use pipeline::reduce::Summarizer;
pub use pipeline::tokens::{CharRatioEstimator, ScriptAwareEstimator, TokenEstimator};
pub use process::{
    analyze_transcript, answer_question, build_transcript, summarize_text, summarize_transcript,
    transcribe,
};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use provider::{resolve_model_client, LlmModelClient, ModelClient};
