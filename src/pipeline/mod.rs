//! Pipeline stages from OCR fragments to a budget-bounded summary.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. Only [`llm`] and [`reduce`] touch the model collaborator.
//!
//! ## Data Flow
//!
//! ```text
//! ocr ──▶ geometry ──▶ transcript ──▶ chunker ──▶ reduce ──▶ SummaryNode
//!                                       ▲  │         │
//!                                 tokens┘  └── llm ◀─┘ (retry, postprocess)
//! ```
//!
//! 1. [`ocr`]: OCR collaborator trait and the Textract response adapter
//! 2. [`geometry`]: row-quantised reading-order sort within a page
//! 3. [`transcript`]: group by page, drop malformed boxes, join text
//! 4. [`tokens`]: deterministic token estimators
//! 5. [`chunker`]: greedy, lossless paragraph packing under a budget
//! 6. [`llm`]: one model call with timeout and exponential backoff
//! 7. [`postprocess`]: deterministic cleanup of model output
//! 8. [`reduce`]: concurrent, depth-bounded map-reduce summarization

pub mod chunker;
pub mod geometry;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod reduce;
pub mod tokens;
pub mod transcript;
