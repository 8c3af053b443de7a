//! OCR collaborator interface and the Textract response adapter.
//!
//! The pipeline never runs OCR itself. It consumes fragments from an
//! [`OcrEngine`], or parses a stored AWS Textract `DetectDocumentText`
//! response with [`parse_textract_response`].

use crate::document::{TextFragment, Transcript};
use crate::error::{OcrError, PipelineError};
use crate::pipeline::transcript::assemble;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// Text detection over one page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Detect text lines in `image`. Fragment order is detection order.
    async fn detect(&self, image: &[u8]) -> Result<Vec<TextFragment>, OcrError>;
}

/// Run `ocr` over page images in order and assemble the transcript.
///
/// Image `i` becomes page `i + 1`, whatever page number the engine reported.
pub async fn transcribe(
    ocr: &dyn OcrEngine,
    images: &[Vec<u8>],
) -> Result<Transcript, PipelineError> {
    let mut fragments = Vec::new();
    for (idx, image) in images.iter().enumerate() {
        let page = idx as u32 + 1;
        info!("Processing image {}/{}", page, images.len());
        let detected = ocr.detect(image).await?;
        debug!("Page {}: {} fragments detected", page, detected.len());
        fragments.extend(detected.into_iter().map(|f| TextFragment { page, ..f }));
    }
    assemble(fragments)
}

// ── Textract JSON ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextractResponse {
    #[serde(default)]
    blocks: Vec<TextractBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextractBlock {
    block_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    geometry: TextractGeometry,
    page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextractGeometry {
    #[serde(default)]
    bounding_box: TextractBox,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextractBox {
    #[serde(default)]
    top: f64,
    #[serde(default)]
    left: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

/// Extract `LINE` blocks from a Textract response body as fragments.
///
/// Blocks without a `Page` field (single-page synchronous responses) are
/// assigned `default_page`. Other block types (`PAGE`, `WORD`) are ignored.
pub fn parse_textract_response(
    json: &str,
    default_page: u32,
) -> Result<Vec<TextFragment>, PipelineError> {
    let response: TextractResponse = serde_json::from_str(json)
        .map_err(|e| PipelineError::InvalidOcrResponse(format!("Textract JSON: {e}")))?;

    Ok(response
        .blocks
        .into_iter()
        .filter(|b| b.block_type == "LINE")
        .map(|b| {
            let bb = b.geometry.bounding_box;
            TextFragment {
                text: b.text,
                top: bb.top,
                left: bb.left,
                width: bb.width,
                height: bb.height,
                confidence: b.confidence,
                page: b.page.unwrap_or(default_page),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SAMPLE: &str = r#"{
        "Blocks": [
            {"BlockType": "PAGE", "Geometry": {"BoundingBox": {"Top": 0, "Left": 0, "Width": 1, "Height": 1}}},
            {"BlockType": "LINE", "Text": "Total: $1,234.56", "Confidence": 99.1,
             "Geometry": {"BoundingBox": {"Top": 0.40, "Left": 0.1, "Width": 0.3, "Height": 0.05}}},
            {"BlockType": "LINE", "Text": "INVOICE", "Confidence": 99.5,
             "Geometry": {"BoundingBox": {"Top": 0.05, "Left": 0.4, "Width": 0.2, "Height": 0.05}}},
            {"BlockType": "LINE", "Text": "Date: 2024-01-15", "Confidence": 97.8,
             "Geometry": {"BoundingBox": {"Top": 0.20, "Left": 0.1, "Width": 0.3, "Height": 0.05}}},
            {"BlockType": "LINE", "Text": "Invoice #: 12345", "Confidence": 98.2,
             "Geometry": {"BoundingBox": {"Top": 0.15, "Left": 0.1, "Width": 0.3, "Height": 0.05}}},
            {"BlockType": "WORD", "Text": "INVOICE", "Confidence": 99.5,
             "Geometry": {"BoundingBox": {"Top": 0.05, "Left": 0.4, "Width": 0.2, "Height": 0.05}}}
        ]
    }"#;

    #[test]
    fn parses_only_line_blocks() {
        let frags = parse_textract_response(SAMPLE, 1).unwrap();
        assert_eq!(frags.len(), 4);
        assert!(frags.iter().all(|f| f.page == 1));
    }

    #[test]
    fn textract_reading_order_and_confidence() {
        let t = assemble(parse_textract_response(SAMPLE, 1).unwrap()).unwrap();
        assert_eq!(
            t.full_text,
            "INVOICE\nInvoice #: 12345\nDate: 2024-01-15\nTotal: $1,234.56"
        );
        let expected = (99.5 + 98.2 + 97.8 + 99.1) / 4.0;
        assert!((t.mean_confidence - expected).abs() < 0.1);
    }

    #[test]
    fn empty_blocks_yield_no_fragments() {
        assert!(parse_textract_response(r#"{"Blocks": []}"#, 1)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn explicit_page_field_wins() {
        let json = r#"{"Blocks": [{"BlockType": "LINE", "Text": "p3", "Page": 3}]}"#;
        let frags = parse_textract_response(json, 1).unwrap();
        assert_eq!(frags[0].page, 3);
        assert_eq!(frags[0].top, 0.0);
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = parse_textract_response("{not json", 1).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOcrResponse(_)));
    }

    struct StubOcr {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn detect(&self, image: &[u8]) -> Result<Vec<TextFragment>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if image.is_empty() {
                return Err(OcrError::Unavailable("blank upload".into()));
            }
            let text = String::from_utf8_lossy(image).to_string();
            Ok(vec![TextFragment::new(text, 0.1, 0.1, 99)])
        }
    }

    #[tokio::test]
    async fn transcribe_numbers_pages_by_image_order() {
        let ocr = StubOcr {
            calls: AtomicUsize::new(0),
        };
        let images = vec![b"first".to_vec(), b"second".to_vec()];
        let t = transcribe(&ocr, &images).await.unwrap();
        assert_eq!(t.full_text, "first\n\nsecond");
        assert_eq!(t.pages[1].number, 2);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transcribe_propagates_ocr_failure() {
        let ocr = StubOcr {
            calls: AtomicUsize::new(0),
        };
        let err = transcribe(&ocr, &[Vec::new()]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::Unavailable(_))));
    }

    #[tokio::test]
    async fn transcribe_without_images_is_empty() {
        let ocr = StubOcr {
            calls: AtomicUsize::new(0),
        };
        let err = transcribe(&ocr, &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTranscript));
    }
}
