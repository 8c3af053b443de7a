//! Property-based tests for the deterministic stages.
//!
//! Properties checked over generated inputs:
//! - Chunking is lossless: chunk texts concatenate back to the input
//! - Chunks that are not flagged oversized fit the budget
//! - Reading-order sort keeps every fragment and orders by (row, left)
//! - Same-row fragments sort identically whatever their detection order

use ocr_digest::pipeline::geometry::row_key;
use ocr_digest::{sort_reading_order, Chunker, TextFragment};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Paragraph-ish text with a mix of paragraph breaks and plain line breaks.
fn document_text() -> impl Strategy<Value = String> {
    let sep = prop_oneof![
        Just("\n\n"),
        Just("\n\n\n"),
        Just("\r\n\r\n"),
        Just("\n \n"),
        Just("\n"),
        Just(" "),
    ];
    prop::collection::vec(("[A-Za-z0-9 .,:$#]{0,60}", sep), 0..12).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(para, sep)| format!("{para}{sep}"))
            .collect()
    })
}

/// Fragments of one page with arbitrary normalised boxes.
fn page_fragments() -> impl Strategy<Value = Vec<TextFragment>> {
    prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 0..40).prop_map(|boxes| {
        boxes
            .into_iter()
            .enumerate()
            .map(|(i, (top, left))| TextFragment::new(format!("f{i}"), top, left, 1))
            .collect()
    })
}

/// One row of fragments with distinct lefts and sub-row jitter, plus the same
/// fragments in a shuffled detection order.
fn same_row_permutations() -> impl Strategy<Value = (Vec<TextFragment>, Vec<TextFragment>)> {
    prop::collection::hash_set(0u16..1000, 1..20).prop_flat_map(|lefts| {
        let row: Vec<TextFragment> = lefts
            .into_iter()
            .enumerate()
            .map(|(i, left)| {
                let top = 0.30 + (i % 4) as f64 * 0.001;
                TextFragment::new(format!("f{i}"), top, f64::from(left) / 1000.0, 1)
            })
            .collect();
        (Just(row.clone()), Just(row).prop_shuffle())
    })
}

fn texts(fragments: &[TextFragment]) -> Vec<String> {
    fragments.iter().map(|f| f.text.clone()).collect()
}

// ============================================================================
// Chunker Properties
// ============================================================================

proptest! {
    /// Property: concat(split(text, n)) == text for every n > 0
    #[test]
    fn chunking_is_lossless(text in document_text(), budget in 1usize..200) {
        let chunks = Chunker::default().split(&text, budget);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(rebuilt, text);
    }

    /// Property: raw text with arbitrary newline runs is also lossless
    #[test]
    fn chunking_raw_text_is_lossless(text in "[a-z \n\t]{0,300}", budget in 1usize..50) {
        let chunks = Chunker::default().split(&text, budget);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(rebuilt, text);
    }

    /// Property: every chunk not flagged oversized fits the budget
    #[test]
    fn chunks_respect_budget(text in document_text(), budget in 1usize..200) {
        let chunks = Chunker::default().split(&text, budget);
        for (i, c) in chunks.iter().enumerate() {
            prop_assert_eq!(c.index, i);
            prop_assert!(
                c.oversized || c.estimated_tokens <= budget,
                "chunk {} has {} tokens over budget {}", i, c.estimated_tokens, budget
            );
        }
    }
}

// ============================================================================
// Reading-Order Properties
// ============================================================================

proptest! {
    /// Property: sorting keeps every fragment and orders by (row, left)
    #[test]
    fn sort_preserves_fragments(fragments in page_fragments()) {
        let sorted = sort_reading_order(fragments.clone());
        prop_assert_eq!(sorted.len(), fragments.len());

        let mut before = texts(&fragments);
        let mut after = texts(&sorted);
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);

        for pair in sorted.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let (row_a, row_b) = (row_key(a.top), row_key(b.top));
            prop_assert!(row_a < row_b || (row_a == row_b && a.left <= b.left));
        }
    }

    /// Property: same-row fragments with distinct lefts sort identically
    /// under any permutation of detection order
    #[test]
    fn same_row_sort_ignores_detection_order((row, shuffled) in same_row_permutations()) {
        let expected = texts(&sort_reading_order(row));
        let actual = texts(&sort_reading_order(shuffled));
        prop_assert_eq!(expected, actual);
    }
}
