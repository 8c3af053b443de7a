//! Data model shared by every pipeline stage.
//!
//! All types are plain owned values with `serde` derives so callers can
//! persist a [`Transcript`] or ship a [`SummaryNode`] over the wire without
//! wrapper types. None of them are mutated after construction: reprocessing a
//! document builds a new [`Transcript`] rather than patching an old one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// One OCR-detected line of text with its bounding box.
///
/// Coordinates are normalised to the page (`0.0..=1.0`), matching what
/// Textract reports in `Geometry.BoundingBox`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    /// OCR confidence in percent (`0.0..=100.0`).
    pub confidence: f64,
    /// 1-based page number.
    pub page: u32,
}

impl TextFragment {
    /// Convenience constructor for a fragment with zero-size geometry and
    /// full confidence; mostly useful in tests.
    pub fn new(text: impl Into<String>, top: f64, left: f64, page: u32) -> Self {
        Self {
            text: text.into(),
            top,
            left,
            width: 0.0,
            height: 0.0,
            confidence: 100.0,
            page,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// A bounding box is malformed when any coordinate is non-finite or the
    /// box has negative extent.
    pub fn has_valid_geometry(&self) -> bool {
        [self.top, self.left, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// The fragments of one page, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub fragments: Vec<TextFragment>,
}

impl Page {
    /// Fragment texts joined by single newlines.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An ordered document assembled from OCR output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Pages in ascending page-number order.
    pub pages: Vec<Page>,
    /// Page texts joined by a blank line.
    pub full_text: String,
    /// Unweighted mean of every kept fragment's confidence.
    pub mean_confidence: f64,
    /// Fragments rejected for malformed geometry.
    pub dropped_fragments: usize,
}

impl Transcript {
    pub fn fragment_count(&self) -> usize {
        self.pages.iter().map(|p| p.fragments.len()).sum()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A token-budget-respecting contiguous slice of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based position in document order.
    pub index: usize,
    /// Exact slice of the source text, including trailing paragraph break.
    pub text: String,
    /// Estimate of `text` without its trailing paragraph break.
    pub estimated_tokens: usize,
    /// Byte offsets into the source text.
    pub source_range: Range<usize>,
    /// A single paragraph that alone exceeds the budget.
    pub oversized: bool,
}

/// Output of one reduction step.
///
/// Leaves (a single chunk summarised directly) have the depth of the pass
/// that produced them; a merged candidate from pass `d` has depth `d + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryNode {
    pub text: String,
    pub estimated_tokens: usize,
    pub depth: u32,
    /// The node exceeds the budget: either the depth ceiling was hit or the
    /// model returned an oversized summary for an oversized unit.
    pub over_budget: bool,
}

/// Role of a prior turn in a document Q&A conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Coarse document type reported by [`crate::process::analyze_transcript`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Invoice,
    Receipt,
    Letter,
    #[default]
    #[serde(other)]
    Other,
}

/// Structured analysis of a document, as returned by the model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    #[serde(default)]
    pub category: DocumentCategory,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub summary: Option<String>,
    /// Free-form entities (`date`, `total_amount`, `vendor`, …); values may be
    /// `null` when the model could not find them.
    #[serde(default)]
    pub key_entities: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
    /// Set only on the fallback produced when the model output was not JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentAnalysis {
    pub(crate) fn unparseable(reason: impl Into<String>) -> Self {
        Self {
            category: DocumentCategory::Other,
            confidence: 0.0,
            summary: Some("Failed to parse analysis".to_string()),
            key_entities: BTreeMap::new(),
            suggested_tags: Vec::new(),
            error: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_extent_is_malformed() {
        let f = TextFragment::new("x", 0.1, 0.1, 1).with_size(-0.2, 0.05);
        assert!(!f.has_valid_geometry());
    }

    #[test]
    fn nan_coordinate_is_malformed() {
        let f = TextFragment::new("x", f64::NAN, 0.1, 1);
        assert!(!f.has_valid_geometry());
    }

    #[test]
    fn zero_size_box_is_valid() {
        assert!(TextFragment::new("x", 0.0, 0.0, 1).has_valid_geometry());
    }

    #[test]
    fn unknown_category_deserialises_as_other() {
        let a: DocumentAnalysis =
            serde_json::from_str(r#"{"category": "bank_statement", "confidence": 0.7}"#).unwrap();
        assert_eq!(a.category, DocumentCategory::Other);
        assert!((a.confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn fallback_analysis_is_marked() {
        let a = DocumentAnalysis::unparseable("expected value at line 1");
        assert_eq!(a.category, DocumentCategory::Other);
        assert_eq!(a.summary.as_deref(), Some("Failed to parse analysis"));
        assert!(a.error.is_some());
    }
}
