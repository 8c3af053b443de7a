//! Reading-order sort for the fragments of one page.
//!
//! Each fragment's `top` is quantised to a row key so that lines whose
//! vertical positions differ by OCR jitter (under ~1% of page height) land in
//! the same horizontal band. Bands are read top to bottom, fragments within a
//! band left to right, and exact ties keep detection order.
//!
//! This is a single sort, not a column detector: true multi-column layouts
//! interleave their columns row by row.

use crate::document::TextFragment;

/// Vertical quantisation factor for normalised `top` coordinates.
pub const ROW_SCALE: f64 = 100.0;

/// Row band of a normalised vertical position.
pub fn row_key(top: f64) -> i64 {
    (top * ROW_SCALE).round() as i64
}

/// Order one page's fragments into reading order.
///
/// `fragments` must be in detection order; that order is the final
/// tie-break. The output always has the same length as the input.
pub fn sort_reading_order(fragments: Vec<TextFragment>) -> Vec<TextFragment> {
    let mut keyed: Vec<(i64, usize, TextFragment)> = fragments
        .into_iter()
        .enumerate()
        .map(|(idx, f)| (row_key(f.top), idx, f))
        .collect();

    keyed.sort_by(|(row_a, idx_a, a), (row_b, idx_b, b)| {
        row_a
            .cmp(row_b)
            .then_with(|| a.left.total_cmp(&b.left))
            .then_with(|| idx_a.cmp(idx_b))
    });

    keyed.into_iter().map(|(_, _, f)| f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(v: &[TextFragment]) -> Vec<&str> {
        v.iter().map(|f| f.text.as_str()).collect()
    }

    #[test]
    fn invoice_reads_row_then_column() {
        let frags = vec![
            TextFragment::new("Total: $50", 0.20, 0.10, 1),
            TextFragment::new("#12345", 0.10, 0.40, 1),
            TextFragment::new("INVOICE", 0.10, 0.10, 1),
        ];
        let sorted = sort_reading_order(frags);
        assert_eq!(texts(&sorted), vec!["INVOICE", "#12345", "Total: $50"]);
    }

    #[test]
    fn jitter_within_a_row_collapses() {
        // 0.101 and 0.104 both quantise to row 10; left decides.
        let frags = vec![
            TextFragment::new("right", 0.101, 0.6, 1),
            TextFragment::new("left", 0.104, 0.1, 1),
        ];
        assert_eq!(texts(&sort_reading_order(frags)), vec!["left", "right"]);
    }

    #[test]
    fn distinct_rows_do_not_merge() {
        let frags = vec![
            TextFragment::new("second", 0.12, 0.1, 1),
            TextFragment::new("first", 0.10, 0.9, 1),
        ];
        assert_eq!(texts(&sort_reading_order(frags)), vec!["first", "second"]);
    }

    #[test]
    fn exact_ties_keep_detection_order() {
        let frags = vec![
            TextFragment::new("a", 0.3, 0.2, 1),
            TextFragment::new("b", 0.3, 0.2, 1),
            TextFragment::new("c", 0.3, 0.2, 1),
        ];
        assert_eq!(texts(&sort_reading_order(frags)), vec!["a", "b", "c"]);
    }

    #[test]
    fn same_row_permutations_agree() {
        let base = vec![
            TextFragment::new("one", 0.50, 0.05, 1),
            TextFragment::new("two", 0.502, 0.35, 1),
            TextFragment::new("three", 0.498, 0.70, 1),
            TextFragment::new("four", 0.80, 0.10, 1),
        ];
        let expected = texts(&sort_reading_order(base.clone()))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let permutations = [[2, 0, 1, 3], [1, 2, 0, 3], [3, 2, 1, 0], [0, 3, 2, 1]];
        for perm in permutations {
            let shuffled: Vec<_> = perm.iter().map(|&i| base[i].clone()).collect();
            let got = sort_reading_order(shuffled);
            assert_eq!(got.len(), base.len());
            assert_eq!(texts(&got), expected, "permutation {perm:?}");
        }
    }

    #[test]
    fn empty_page_is_empty() {
        assert!(sort_reading_order(Vec::new()).is_empty());
    }

    #[test]
    fn two_column_layout_interleaves() {
        let frags = vec![
            TextFragment::new("Left Column Line 1", 0.1, 0.1, 1),
            TextFragment::new("Right Column Line 1", 0.1, 0.6, 1),
            TextFragment::new("Left Column Line 2", 0.2, 0.1, 1),
            TextFragment::new("Right Column Line 2", 0.2, 0.6, 1),
        ];
        assert_eq!(
            texts(&sort_reading_order(frags)),
            vec![
                "Left Column Line 1",
                "Right Column Line 1",
                "Left Column Line 2",
                "Right Column Line 2"
            ]
        );
    }

    #[test]
    fn row_key_rounds_to_nearest_band() {
        assert_eq!(row_key(0.10), 10);
        assert_eq!(row_key(0.1049), 10);
        assert_eq!(row_key(0.1051), 11);
        assert_eq!(row_key(0.0), 0);
    }
}
