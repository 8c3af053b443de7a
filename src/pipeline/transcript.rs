//! Assemble sorted fragments into a [`Transcript`].
//!
//! Fragments are grouped by page, malformed boxes are dropped (and counted),
//! each page is put into reading order by [`super::geometry`], and page texts
//! are joined with a blank line in ascending page order.

use crate::document::{Page, TextFragment, Transcript};
use crate::error::PipelineError;
use crate::pipeline::geometry::sort_reading_order;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Separator between fragments of one page.
pub const FRAGMENT_SEPARATOR: &str = "\n";

/// Separator between pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Build a transcript from fragments in detection order.
///
/// Fragments may arrive interleaved across pages; detection order within a
/// page is preserved as the sort tie-break.
///
/// # Errors
/// - [`PipelineError::MalformedPage`] if a page had fragments but every one
///   of them had a malformed bounding box.
/// - [`PipelineError::EmptyTranscript`] if no fragment remains overall.
pub fn assemble(
    fragments: impl IntoIterator<Item = TextFragment>,
) -> Result<Transcript, PipelineError> {
    let mut by_page: BTreeMap<u32, (Vec<TextFragment>, usize)> = BTreeMap::new();

    for fragment in fragments {
        let entry = by_page.entry(fragment.page).or_default();
        if fragment.has_valid_geometry() {
            entry.0.push(fragment);
        } else {
            warn!(
                "Page {}: dropping fragment {:?} with malformed bounding box",
                fragment.page, fragment.text
            );
            entry.1 += 1;
        }
    }

    let mut pages = Vec::with_capacity(by_page.len());
    let mut dropped_fragments = 0;

    for (number, (kept, dropped)) in by_page {
        dropped_fragments += dropped;
        if kept.is_empty() {
            return Err(PipelineError::MalformedPage {
                page: number,
                dropped,
            });
        }
        pages.push(Page {
            number,
            fragments: sort_reading_order(kept),
        });
    }

    let total: usize = pages.iter().map(|p| p.fragments.len()).sum();
    if total == 0 {
        return Err(PipelineError::EmptyTranscript);
    }

    let confidence_sum: f64 = pages
        .iter()
        .flat_map(|p| p.fragments.iter())
        .map(|f| f.confidence)
        .sum();
    let mean_confidence = confidence_sum / total as f64;

    let full_text = pages
        .iter()
        .map(Page::text)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);

    debug!(
        "Assembled transcript: {} pages, {} fragments, {} chars, {:.2}% mean confidence",
        pages.len(),
        total,
        full_text.len(),
        mean_confidence
    );

    Ok(Transcript {
        pages,
        full_text,
        mean_confidence,
        dropped_fragments,
    })
}
