//! Paragraph-respecting, token-bounded splitting.
//!
//! A transcript is cut into *units*: one paragraph plus the blank-line run
//! that follows it. Units are packed greedily into chunks until the next
//! paragraph would push the chunk over budget. Boundaries therefore only ever
//! fall on paragraph breaks, and concatenating the chunk texts in order
//! reproduces the input byte for byte.
//!
//! Budgets are checked against a chunk's *content*: its slice without the
//! trailing paragraph break, which is what the model is sent. A unit whose
//! paragraph alone exceeds the budget becomes its own chunk flagged
//! `oversized`; it is never split mid-paragraph.

use crate::document::Chunk;
use crate::pipeline::tokens::{CharRatioEstimator, TokenEstimator};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Paragraph break: two or more line breaks, optionally separated by
/// horizontal whitespace.
static RE_PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n[ \t]*){2,}").unwrap());

/// Splits text into budgeted chunks using an injected [`TokenEstimator`].
#[derive(Debug, Clone)]
pub struct Chunker {
    estimator: Arc<dyn TokenEstimator>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(Arc::new(CharRatioEstimator::default()))
    }
}

impl Chunker {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }

    /// Split `text` into chunks of at most `max_tokens` estimated tokens.
    ///
    /// Empty input yields no chunks. `max_tokens == 0` makes every paragraph
    /// an oversized chunk of its own.
    pub fn split(&self, text: &str, max_tokens: usize) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Option<Unit> = None;

        for unit in paragraph_units(text) {
            let Some(open) = current.take() else {
                current = Some(unit);
                continue;
            };
            let grown_content = open.span.start..unit.content_end;
            if self.estimator.estimate(&text[grown_content]) <= max_tokens {
                current = Some(Unit {
                    span: open.span.start..unit.span.end,
                    content_end: unit.content_end,
                });
            } else {
                chunks.push(self.close(text, open, chunks.len(), max_tokens));
                current = Some(unit);
            }
        }

        if let Some(open) = current {
            chunks.push(self.close(text, open, chunks.len(), max_tokens));
        }

        debug!(
            "Split {} chars into {} chunks (budget {} tokens, {} oversized)",
            text.len(),
            chunks.len(),
            max_tokens,
            chunks.iter().filter(|c| c.oversized).count()
        );
        chunks
    }

    fn close(&self, text: &str, unit: Unit, index: usize, max_tokens: usize) -> Chunk {
        let estimated_tokens = self
            .estimator
            .estimate(&text[unit.span.start..unit.content_end]);
        Chunk {
            index,
            text: text[unit.span.clone()].to_string(),
            estimated_tokens,
            source_range: unit.span,
            oversized: estimated_tokens > max_tokens,
        }
    }
}

/// A byte span of the source and where its content ends, i.e. where the
/// trailing paragraph break (if any) starts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unit {
    span: Range<usize>,
    content_end: usize,
}

/// Each paragraph with its trailing break. The spans are contiguous and
/// cover `text` exactly.
fn paragraph_units(text: &str) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut start = 0;
    for brk in RE_PARAGRAPH_BREAK.find_iter(text) {
        if brk.end() > start {
            units.push(Unit {
                span: start..brk.end(),
                content_end: brk.start().max(start),
            });
            start = brk.end();
        }
    }
    if start < text.len() {
        units.push(Unit {
            span: start..text.len(),
            content_end: text.len(),
        });
    }
    units
}
